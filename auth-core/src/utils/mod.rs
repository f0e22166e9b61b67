pub mod password;

pub use password::{
    hash_password, unusable_password_hash, verify_password, Password, PasswordHashString,
};
