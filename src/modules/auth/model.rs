pub use siges_models::auth::{AccessToken, TokenObtainRequest, TokenPair, TokenRefreshRequest};
