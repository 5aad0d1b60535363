pub mod decodable;

pub use decodable::client::{DecodableClient, DecodableClientConfig};
pub use decodable::error::ApiClientError;
pub use decodable::StreamingApi;
