pub mod assignment;
pub mod dashboard;
pub mod idea;
pub mod login;
pub mod not_found;
pub mod signup;
