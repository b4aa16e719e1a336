// handlers/protected/user/mod.rs - Profile updates for the authenticated user

mod avatar; // PUT /api/user/avatar

pub use avatar::avatar;
