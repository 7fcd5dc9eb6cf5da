use rust_decimal::Decimal;

/// Percentual `part / total` arredondado em 2 casas. Zero quando não há total.
pub fn percent(part: i64, total: i64) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}

/// Média simples arredondada em 2 casas.
pub fn average(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    (values.iter().sum::<Decimal>() / Decimal::from(values.len())).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_two_places() {
        assert_eq!(percent(1, 3), Decimal::new(3333, 2));
        assert_eq!(percent(3, 3), Decimal::ONE_HUNDRED);
        assert_eq!(percent(5, 0), Decimal::ZERO);
    }

    #[test]
    fn average_of_rates() {
        let rates = [Decimal::new(50, 0), Decimal::new(755, 1)];
        assert_eq!(average(&rates), Decimal::new(6275, 2));
        assert_eq!(average(&[]), Decimal::ZERO);
    }
}
