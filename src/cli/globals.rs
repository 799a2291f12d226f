use crate::api::DEFAULT_API_URL;
use crate::login::DEFAULT_COUNTRY_CODE;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub country_code: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }

    pub fn set_country_code(&mut self, country_code: String) {
        self.country_code = country_code;
    }
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL.to_string())
    }
}
