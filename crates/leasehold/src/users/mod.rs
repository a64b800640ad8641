//! Account holders that own payments, subscriptions and payment methods.

pub mod domain;

pub use domain::{User, UserDto};
