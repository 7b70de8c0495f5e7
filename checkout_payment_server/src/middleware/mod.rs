mod callback_token;

pub use callback_token::{CallbackTokenMiddlewareFactory, CallbackTokenMiddlewareService};
