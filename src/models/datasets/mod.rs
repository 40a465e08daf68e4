pub mod calls;
pub mod captures;
