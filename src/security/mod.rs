pub mod credentials;
pub mod request_signer;

pub use credentials::Credentials;
pub use request_signer::{Action, Api, RequestSigner, SecurityBlock, SignatureVersion, SignedEnvelope};
