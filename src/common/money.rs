// src/common/money.rs

//! Aritmética monetária em decimal fixo (2 casas).
//!
//! Nada de `f64` aqui: subtotal, descontos e valores líquidos de taxa precisam
//! fechar centavo a centavo.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::common::error::AppError;

/// Casas decimais de qualquer valor em dinheiro
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerância para comparações monetárias (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maior valor aceito: 9_999_999_999.99, o que cabe em NUMERIC(12, 2)
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Maior quantidade de um item na comanda
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Arredonda para centavos usando arredondamento bancário (meio para o par).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Produto que estoura o `Decimal` vira `InvalidAmount`, nunca panic.
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, AppError> {
    a.checked_mul(b).ok_or(AppError::InvalidAmount(a))
}

pub fn checked_sum<I>(values: I) -> Result<Decimal, AppError>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or(AppError::InvalidAmount(v))
    })
}

/// `pct`% de `amount`, já arredondado para centavos.
pub fn percent_of(amount: Decimal, pct: Decimal) -> Result<Decimal, AppError> {
    Ok(round_money(checked_mul(amount, pct)? / Decimal::ONE_HUNDRED))
}

pub fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Valor aceito como pagamento: positivo e sem frações de centavo.
pub fn is_valid_tender(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount <= MAX_MONEY && amount.normalize().scale() <= DECIMAL_PLACES
}

/// Valor de preço/desconto: não negativo, até `MAX_MONEY` e sem frações de centavo.
pub fn is_valid_price(amount: Decimal) -> bool {
    amount >= Decimal::ZERO
        && amount <= MAX_MONEY
        && amount.normalize().scale() <= DECIMAL_PLACES
}

pub fn is_valid_quantity(quantity: Decimal) -> bool {
    quantity > Decimal::ZERO && quantity <= MAX_QUANTITY
}

pub fn is_valid_percentage(pct: Decimal) -> bool {
    pct >= Decimal::ZERO && pct <= Decimal::ONE_HUNDRED
}

pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// Fixa a escala em 2 casas para exibição ("50" -> "50.00").
pub fn to_cents_scale(value: Decimal) -> Decimal {
    let mut v = round_money(value);
    v.rescale(DECIMAL_PLACES);
    v
}
