pub mod catalog;
pub mod pool;
pub mod record;
pub mod request;
pub mod researcher;

pub trait Endpoint {
    fn endpoint() -> String;
}
