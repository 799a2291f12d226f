//! User-facing messages for API failure envelopes.

use super::types::ErrorResponse;

pub const GENERIC_ERROR_MESSAGE: &str = "Невідома помилка";

/// Maps a machine-readable API error code to a localized message.
#[must_use]
pub fn decode_error_code(code: &str) -> Option<&'static str> {
    let message = match code {
        "COMM_ERROR" => "Помилка спілкування з сервером",
        "BAD_REQUEST" => "Некоректний запит",
        "BAD_PHONE" => "Некоректний номер телефону",
        "UNAUTHORIZED" => "Необхідна авторизація",
        "INVALID_TOKEN" => "Недійсний токен автентифікації",
        "FORBIDDEN" => "Доступ заборонено",
        "USER_NOT_FOUND" => "Користувача з таким номером телефону не знайдено",
        "USER_DISABLED" => "Обліковий запис заблоковано",
        "NOT_FOUND" => "Запитаний ресурс не знайдено",
        "RATE_LIMITED" => "Забагато запитів. Спробуйте пізніше",
        "UPSTREAM_ERROR" => "Помилка сервісу розпізнавання облич",
        "UNKNOWN_ERROR" => GENERIC_ERROR_MESSAGE,
        _ => return None,
    };

    Some(message)
}

/// Decodes a failure envelope into the message shown to the user: the mapped
/// message for known codes, else the server message, else a generic fallback.
#[must_use]
pub fn decode_error_response(response: &ErrorResponse) -> String {
    if let Some(message) = decode_error_code(&response.code) {
        return message.to_string();
    }

    let message = response.message.trim();
    if message.is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
