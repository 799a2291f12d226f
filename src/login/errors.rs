//! User-facing messages for verification provider failures.

use crate::api::GENERIC_ERROR_MESSAGE;

#[must_use]
pub fn decode_provider_code(code: &str) -> Option<&'static str> {
    let message = match code {
        "auth/invalid-phone-number" => "Некоректний номер телефону",
        "auth/missing-phone-number" => "Введіть номер телефону",
        "auth/quota-exceeded" => "Перевищено ліміт SMS. Спробуйте пізніше",
        "auth/too-many-requests" => "Забагато спроб. Спробуйте пізніше",
        "auth/captcha-check-failed" | "auth/invalid-app-credential" => {
            "Не вдалося пройти перевірку reCAPTCHA"
        }
        "auth/user-disabled" => "Обліковий запис заблоковано",
        "auth/operation-not-allowed" => "Вхід за номером телефону вимкнено",
        "auth/invalid-verification-code" => "Невірний код підтвердження",
        "auth/missing-verification-code" => "Введіть код підтвердження",
        "auth/code-expired" => "Термін дії коду минув. Запросіть новий код",
        "auth/invalid-verification-id" | "auth/missing-verification-id" => {
            "Сесія підтвердження недійсна. Запросіть новий код"
        }
        "auth/network-request-failed" => "Помилка мережі. Перевірте з'єднання",
        _ => return None,
    };

    Some(message)
}

/// Message for a provider error: mapped text for known codes, else the
/// provider message, else a generic fallback.
#[must_use]
pub fn decode_provider_error(code: &str, message: &str) -> String {
    if let Some(decoded) = decode_provider_code(code) {
        return decoded.to_string();
    }

    let message = message.trim();
    if message.is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
