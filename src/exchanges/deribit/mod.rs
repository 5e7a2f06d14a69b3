pub mod client;
pub mod codec;
pub mod signer;
pub mod stream;
pub mod types;

// Re-export main types for easier importing
pub use client::DeribitClient;
pub use codec::DeribitCodec;
pub use signer::CredentialSigner;
pub use stream::{MarketStream, StreamState};
pub use types::{extract_access_token, DeribitWsEvent, StreamUpdate};
