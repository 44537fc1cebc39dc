pub mod session;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Whoami { json: bool },
    Login { email: String, password: SecretString },
    AdminLogin { admin_id: String, password: SecretString },
    Logout,
}
