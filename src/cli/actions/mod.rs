pub mod login;
pub mod run;
pub mod search;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Login {
        phone: Option<String>,
        firebase_url: String,
        firebase_api_key: SecretString,
        recaptcha_token: Option<String>,
        print_token: bool,
    },
    CompareStatus {
        guid: String,
    },
    SearchStatus {
        guid: String,
    },
    Matches {
        guid: String,
        face: u32,
    },
}
