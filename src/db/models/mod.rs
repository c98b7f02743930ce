pub mod ledger;
pub mod stream;
pub mod streamer;
