use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a signed-in user may do. Only editors get drag handles, and the
/// server re-checks the role on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub fn can_edit_hierarchy(self) -> bool {
        match self {
            Role::Admin | Role::Instructor => true,
            Role::Student => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
        })
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?} (expected admin, instructor or student)")]
pub struct UnknownRole(pub String);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String, // Base64 encoded
    pub salt: String,          // Base64 encoded
    pub role: Role,
}

#[cfg(feature = "crypto")]
pub use self::crypto::*;

#[cfg(feature = "crypto")]
mod crypto {
    use super::{Role, User};
    use aes_gcm::{
        aead::{Aead, KeyInit},
        Aes256Gcm, Nonce,
    };
    use base64::{engine::general_purpose, Engine as _};
    use hmac::Hmac;
    use pbkdf2::pbkdf2;
    use rand::{rngs::OsRng, RngCore};
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;
    use thiserror::Error;

    const PBKDF2_ROUNDS: u32 = 600_000;
    const NONCE_LEN: usize = 12;

    #[derive(Error, Debug)]
    pub enum AuthError {
        #[error("Encryption error")]
        EncryptionError,
        #[error("Decryption error")]
        DecryptionError,
        #[error("Key derivation error")]
        KeyDerivationError,
        #[error("JSON serialization error: {0}")]
        JsonError(#[from] serde_json::Error),
        #[error("UTF-8 error: {0}")]
        Utf8Error(#[from] std::str::Utf8Error),
        #[error("Decoding error: {0}")]
        DecodeError(#[from] base64::DecodeError),
    }

    fn derive_password_key(password: &str, salt: &[u8]) -> Result<[u8; 32], AuthError> {
        let mut dk = [0u8; 32];
        pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut dk)
            .map_err(|_| AuthError::KeyDerivationError)?;
        Ok(dk)
    }

    /// Returns `(hash, salt)`, both base64.
    pub fn hash_password(password: &str) -> Result<(String, String), AuthError> {
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let dk = derive_password_key(password, &salt)?;
        Ok((
            general_purpose::STANDARD.encode(dk),
            general_purpose::STANDARD.encode(salt),
        ))
    }

    pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
        let (Ok(salt_bytes), Ok(hash_bytes)) = (
            general_purpose::STANDARD.decode(salt),
            general_purpose::STANDARD.decode(hash),
        ) else {
            return false;
        };
        match derive_password_key(password, &salt_bytes) {
            Ok(dk) => dk.ct_eq(&hash_bytes).into(),
            Err(_) => false,
        }
    }

    impl User {
        pub fn with_password(
            username: impl Into<String>,
            password: &str,
            role: Role,
        ) -> Result<Self, AuthError> {
            let (password_hash, salt) = hash_password(password)?;
            Ok(Self {
                username: username.into(),
                password_hash,
                salt,
                role,
            })
        }

        pub fn verify(&self, password: &str) -> bool {
            verify_password(password, &self.password_hash, &self.salt)
        }
    }

    /// Encrypts the user list as base64(nonce || AES-256-GCM ciphertext).
    pub fn encrypt_users(users: &[User], key: &str) -> Result<String, AuthError> {
        let json = serde_json::to_string(users)?;
        let cipher = Aes256Gcm::new(&derive_file_key(key));

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), json.as_bytes())
            .map_err(|_| AuthError::EncryptionError)?;

        let mut payload = nonce.to_vec();
        payload.extend(ciphertext);
        Ok(general_purpose::STANDARD.encode(payload))
    }

    pub fn decrypt_users(encrypted_data: &str, key: &str) -> Result<Vec<User>, AuthError> {
        let payload = general_purpose::STANDARD.decode(encrypted_data.trim())?;
        if payload.len() < NONCE_LEN {
            return Err(AuthError::DecryptionError);
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&derive_file_key(key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::DecryptionError)?;

        let json = std::str::from_utf8(&plaintext)?;
        Ok(serde_json::from_str(json)?)
    }

    // 32-byte file key from the configured secret.
    fn derive_file_key(key: &str) -> aes_gcm::Key<Aes256Gcm> {
        let digest = Sha256::digest(key.as_bytes());
        *aes_gcm::Key::<Aes256Gcm>::from_slice(&digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_staff_can_edit() {
        assert!(Role::Admin.can_edit_hierarchy());
        assert!(Role::Instructor.can_edit_hierarchy());
        assert!(!Role::Student.can_edit_hierarchy());
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Instructor".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!(" student ".parse::<Role>(), Ok(Role::Student));
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[cfg(feature = "crypto")]
    #[test]
    fn password_round_trip_and_users_file() {
        let user = User::with_password("ada", "hunter2", Role::Instructor).unwrap();
        assert!(user.verify("hunter2"));
        assert!(!user.verify("hunter3"));

        let sealed = encrypt_users(std::slice::from_ref(&user), "secret").unwrap();
        let opened = decrypt_users(&sealed, "secret").unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].role, Role::Instructor);
        assert!(decrypt_users(&sealed, "wrong").is_err());
    }
}
