pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;

/// 32 random bytes, hex encoded. Used for e-mail verification and reset links.
pub fn generate_random_token() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
