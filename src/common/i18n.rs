// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LANG: &str = "pt";

/// Mensagens de erro por idioma. Chave = `AppError::message_key()`.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let pt: HashMap<&'static str, &'static str> = HashMap::from([
            ("validation_error", "Um ou mais campos são inválidos."),
            ("invalid_transition", "Esta ação não é permitida no status atual."),
            ("missing_ledger", "Adicione itens ou abra uma comanda antes de encerrar o atendimento."),
            ("invalid_schedule", "Horário inválido."),
            ("ledger_closed", "A comanda não está mais aberta."),
            ("unclosable", "A comanda ainda não pode ser fechada."),
            ("unknown_instrument", "Forma de pagamento desconhecida ou inativa."),
            ("invalid_amount", "Valor inválido."),
            ("invalid_quantity", "Quantidade inválida."),
            ("invalid_discount", "Desconto inválido."),
            ("invalid_fee_schedule", "Tabela de taxas inválida."),
            ("not_found", "Recurso não encontrado."),
            ("concurrent_modification", "O registro foi alterado por outra operação. Recarregue e tente novamente."),
            ("internal_error", "Ocorreu um erro inesperado."),
        ]);

        let en: HashMap<&'static str, &'static str> = HashMap::from([
            ("validation_error", "One or more fields are invalid."),
            ("invalid_transition", "This action is not allowed in the current status."),
            ("missing_ledger", "Add items or open a tab before finishing the service."),
            ("invalid_schedule", "Invalid schedule."),
            ("ledger_closed", "The tab is no longer open."),
            ("unclosable", "The tab cannot be closed yet."),
            ("unknown_instrument", "Unknown or inactive payment method."),
            ("invalid_amount", "Invalid amount."),
            ("invalid_quantity", "Invalid quantity."),
            ("invalid_discount", "Invalid discount."),
            ("invalid_fee_schedule", "Invalid fee schedule."),
            ("not_found", "Resource not found."),
            ("concurrent_modification", "The record was changed by another operation. Reload and try again."),
            ("internal_error", "An unexpected error occurred."),
        ]);

        Self {
            messages: HashMap::from([("pt", pt), ("en", en)]),
        }
    }
}

impl I18nStore {
    /// Traduz a chave; cai para português e, em último caso, devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}
