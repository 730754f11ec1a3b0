pub mod cfn_response;

pub use cfn_response::{HttpResponseSender, ResponseSender};
