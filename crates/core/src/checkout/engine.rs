use std::sync::OnceLock;

use regex::Regex;

use crate::checkout::states::{CheckoutData, CheckoutSideEffect, CheckoutState, StepOutcome};
use crate::domain::customer::Customer;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";
const MIN_PHONE_DIGITS: usize = 9;
const MIN_ADDRESS_CHARS: usize = 10;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Pure transition function over [`CheckoutState`]. Each user turn goes
/// through [`CheckoutEngine::step`]; a transition that needs external data
/// (the returning-customer lookup) or wants the order created expresses that
/// as a [`CheckoutSideEffect`] for the orchestrator to perform.
#[derive(Clone, Debug, Default)]
pub struct CheckoutEngine;

impl CheckoutEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> CheckoutState {
        CheckoutState::AskIfRecurrent
    }

    pub fn opening_prompt(&self) -> String {
        "Vamos a tramitar tu pedido. ¿Ya has comprado con nosotros antes? (sí/no)".to_string()
    }

    pub fn step(&self, state: &CheckoutState, input: &str, data: &CheckoutData) -> StepOutcome {
        match state {
            CheckoutState::AskIfRecurrent => self.ask_if_recurrent(input, data),
            CheckoutState::GetRecurrentEmail => self.get_recurrent_email(input, data),
            CheckoutState::ConfirmRecurrentData => self.confirm_recurrent_data(input, data),
            CheckoutState::CollectName => self.collect_name(input, data),
            CheckoutState::CollectEmail => self.collect_email(input, data),
            CheckoutState::CollectPhone => self.collect_phone(input, data),
            CheckoutState::CollectAddress => self.collect_address(input, data),
        }
    }

    /// Feeds the returning-customer lookup result back into the machine.
    /// Found: pre-fill from the record and ask for confirmation. Not found:
    /// carry the email forward and start collecting from the name.
    pub fn apply_customer_lookup(
        &self,
        email: &str,
        found: Option<&Customer>,
        data: &CheckoutData,
    ) -> StepOutcome {
        match found {
            Some(customer) => {
                let filled = CheckoutData {
                    name: Some(customer.name.clone()),
                    email: Some(customer.email.clone()),
                    phone: Some(customer.phone.clone()),
                    address: Some(customer.address.clone()),
                };
                StepOutcome {
                    next: Some(CheckoutState::ConfirmRecurrentData),
                    replies: vec![format!(
                        "Te encontramos: {}, {}, tel. {}, {}. ¿Son correctos estos datos? (sí/no)",
                        customer.name, customer.email, customer.phone, customer.address
                    )],
                    data: filled,
                    side_effect: None,
                }
            }
            None => StepOutcome {
                next: Some(CheckoutState::CollectName),
                replies: vec![
                    "No encontramos ese correo, así que te registramos como cliente nuevo."
                        .to_string(),
                    "¿Cuál es tu nombre completo?".to_string(),
                ],
                data: CheckoutData { email: Some(email.to_string()), ..data.clone() },
                side_effect: None,
            },
        }
    }

    fn ask_if_recurrent(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        match parse_yes_no(input) {
            Some(true) => StepOutcome {
                next: Some(CheckoutState::GetRecurrentEmail),
                replies: vec!["Perfecto. ¿Cuál es tu correo electrónico?".to_string()],
                data: data.clone(),
                side_effect: None,
            },
            Some(false) => StepOutcome {
                next: Some(CheckoutState::CollectName),
                replies: vec![
                    "Vamos a registrar tus datos. ¿Cuál es tu nombre completo?".to_string()
                ],
                data: data.clone(),
                side_effect: None,
            },
            None => self.reprompt(
                CheckoutState::AskIfRecurrent,
                "Disculpa, no te he entendido. ¿Ya has comprado con nosotros antes? (sí/no)",
                data,
            ),
        }
    }

    fn get_recurrent_email(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        let email = input.trim();
        if !is_valid_email(email) {
            return self.reprompt(
                CheckoutState::GetRecurrentEmail,
                "Ese correo no parece válido. ¿Puedes escribirlo de nuevo?",
                data,
            );
        }
        StepOutcome {
            next: Some(CheckoutState::GetRecurrentEmail),
            replies: Vec::new(),
            data: data.clone(),
            side_effect: Some(CheckoutSideEffect::LookupCustomer { email: email.to_string() }),
        }
    }

    fn confirm_recurrent_data(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        match parse_yes_no(input) {
            Some(true) => StepOutcome {
                next: None,
                replies: Vec::new(),
                data: data.clone(),
                side_effect: Some(CheckoutSideEffect::Finalize),
            },
            // Re-collect from the name onward; the email is kept and will
            // not be asked again.
            Some(false) => StepOutcome {
                next: Some(CheckoutState::CollectName),
                replies: vec![
                    "De acuerdo, actualicemos tus datos. ¿Cuál es tu nombre completo?".to_string()
                ],
                data: CheckoutData { email: data.email.clone(), ..CheckoutData::default() },
                side_effect: None,
            },
            None => self.reprompt(
                CheckoutState::ConfirmRecurrentData,
                "¿Son correctos estos datos? Responde sí o no.",
                data,
            ),
        }
    }

    fn collect_name(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        let name = input.trim();
        if name.is_empty() {
            return self.reprompt(
                CheckoutState::CollectName,
                "Necesito tu nombre para el pedido. ¿Cuál es tu nombre completo?",
                data,
            );
        }
        let updated = CheckoutData { name: Some(name.to_string()), ..data.clone() };
        if updated.email.is_some() {
            StepOutcome {
                next: Some(CheckoutState::CollectPhone),
                replies: vec!["¿Cuál es tu número de teléfono?".to_string()],
                data: updated,
                side_effect: None,
            }
        } else {
            StepOutcome {
                next: Some(CheckoutState::CollectEmail),
                replies: vec!["¿Cuál es tu correo electrónico?".to_string()],
                data: updated,
                side_effect: None,
            }
        }
    }

    fn collect_email(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        let email = input.trim();
        if !is_valid_email(email) {
            return self.reprompt(
                CheckoutState::CollectEmail,
                "Ese correo no parece válido (ejemplo: ana@correo.com). ¿Puedes escribirlo de nuevo?",
                data,
            );
        }
        StepOutcome {
            next: Some(CheckoutState::CollectPhone),
            replies: vec!["¿Cuál es tu número de teléfono?".to_string()],
            data: CheckoutData { email: Some(email.to_string()), ..data.clone() },
            side_effect: None,
        }
    }

    fn collect_phone(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        match normalize_phone(input) {
            Some(phone) => StepOutcome {
                next: Some(CheckoutState::CollectAddress),
                replies: vec!["¿Cuál es tu dirección de entrega?".to_string()],
                data: CheckoutData { phone: Some(phone), ..data.clone() },
                side_effect: None,
            },
            None => self.reprompt(
                CheckoutState::CollectPhone,
                "Ese teléfono no parece válido: necesito al menos 9 dígitos, sin letras.",
                data,
            ),
        }
    }

    fn collect_address(&self, input: &str, data: &CheckoutData) -> StepOutcome {
        let address = input.trim();
        if address.chars().count() < MIN_ADDRESS_CHARS {
            return self.reprompt(
                CheckoutState::CollectAddress,
                "Esa dirección parece demasiado corta. Incluye calle, número y ciudad.",
                data,
            );
        }
        StepOutcome {
            next: None,
            replies: Vec::new(),
            data: CheckoutData { address: Some(address.to_string()), ..data.clone() },
            side_effect: Some(CheckoutSideEffect::Finalize),
        }
    }

    fn reprompt(&self, state: CheckoutState, message: &str, data: &CheckoutData) -> StepOutcome {
        StepOutcome {
            next: Some(state),
            replies: vec![message.to_string()],
            data: data.clone(),
            side_effect: None,
        }
    }
}

fn parse_yes_no(input: &str) -> Option<bool> {
    let normalized: String = input
        .trim()
        .chars()
        .map(|character| match character.to_lowercase().next().unwrap_or(character) {
            'í' => 'i',
            'á' => 'a',
            'é' => 'e',
            'ó' => 'o',
            'ú' => 'u',
            lowered => lowered,
        })
        .collect();
    let first_word = normalized.split_whitespace().next().unwrap_or("");
    match first_word {
        "si" | "claro" | "vale" | "ok" | "correcto" | "exacto" | "afirmativo" => Some(true),
        "no" | "nunca" | "negativo" | "tampoco" => Some(false),
        _ => None,
    }
}

fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Digits only after whitespace stripping; a single leading `+` is allowed
/// for international prefixes.
fn normalize_phone(input: &str) -> Option<String> {
    let stripped: String = input.chars().filter(|character| !character.is_whitespace()).collect();
    let digits = stripped.strip_prefix('+').unwrap_or(&stripped);
    if digits.len() < MIN_PHONE_DIGITS || !digits.chars().all(|character| character.is_ascii_digit())
    {
        return None;
    }
    Some(stripped)
}
