/// Coefficient binomial exact C(n, r).
///
/// Retourne 0 quand `r > n`. Le calcul multiplie puis divise pour `i` croissant :
/// `acc * (n - i)` est toujours divisible par `i + 1` car `acc = C(n, i)`, et
/// `acc * (n - i) / (i + 1) = C(n, i + 1)`. Sature à `u64::MAX` en cas de dépassement
/// (hors domaine : C(45, 6) = 8 145 060).
pub fn choose(n: u64, r: u64) -> u64 {
    if r > n {
        return 0;
    }
    let r = r.min(n - r);
    let mut acc: u128 = 1;
    for i in 0..r as u128 {
        acc = match acc.checked_mul(n as u128 - i) {
            Some(product) => product / (i + 1),
            None => return u64::MAX,
        };
    }
    u64::try_from(acc).unwrap_or(u64::MAX)
}

/// Variante signée : 0 dès qu'un opérande est négatif.
pub fn choose_signed(n: i64, r: i64) -> u64 {
    if n < 0 || r < 0 {
        return 0;
    }
    choose(n as u64, r as u64)
}

/// Nombre total de grilles possibles au 6/45.
pub fn total_combinations() -> u64 {
    choose(45, 6)
}
