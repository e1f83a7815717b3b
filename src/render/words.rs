//! Amounts in words, Indian numbering (Crore, Lakh, Thousand, Hundred).

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn below_hundred(n: u64, out: &mut Vec<&'static str>) {
    let n = n as usize;
    if n < 20 {
        if n > 0 {
            out.push(ONES[n]);
        }
    } else {
        out.push(TENS[n / 10]);
        if n % 10 > 0 {
            out.push(ONES[n % 10]);
        }
    }
}

fn push_words(n: u64, out: &mut Vec<&'static str>) {
    let crore = n / 10_000_000;
    let lakh = (n / 100_000) % 100;
    let thousand = (n / 1_000) % 100;
    let hundred = (n / 100) % 10;
    let rest = n % 100;

    if crore > 0 {
        // crores above 99 keep grouping the Indian way: "One Hundred Crore"
        push_words(crore, out);
        out.push("Crore");
    }
    if lakh > 0 {
        below_hundred(lakh, out);
        out.push("Lakh");
    }
    if thousand > 0 {
        below_hundred(thousand, out);
        out.push("Thousand");
    }
    if hundred > 0 {
        out.push(ONES[hundred as usize]);
        out.push("Hundred");
    }
    below_hundred(rest, out);
}

/// Words for a whole number; `0` is "Zero".
pub fn number_in_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    let mut out = Vec::new();
    push_words(n, &mut out);
    out.join(" ")
}

/// Words for a non-negative amount, rounded to whole paise first.
///
/// A zero paise part omits the "and N Paise" clause. Negative and
/// non-finite amounts read as "Zero".
pub fn amount_in_words(amount: f64) -> String {
    let paise_total = if amount.is_finite() && amount > 0.0 {
        (amount * 100.0).round() as u64
    } else {
        0
    };
    let whole = paise_total / 100;
    let paise = paise_total % 100;

    let mut words = number_in_words(whole);
    if paise > 0 {
        words.push_str(" and ");
        words.push_str(&number_in_words(paise));
        words.push_str(" Paise");
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(amount_in_words(0.0), "Zero");
        assert_eq!(amount_in_words(100.0), "One Hundred");
        assert_eq!(amount_in_words(100_000.0), "One Lakh");
        assert_eq!(
            amount_in_words(1234.50),
            "One Thousand Two Hundred Thirty Four and Fifty Paise"
        );
    }

    #[test]
    fn test_groups() {
        assert_eq!(number_in_words(19), "Nineteen");
        assert_eq!(number_in_words(45), "Forty Five");
        assert_eq!(number_in_words(1_00_00_000), "One Crore");
        assert_eq!(
            number_in_words(12_34_56_789),
            "Twelve Crore Thirty Four Lakh Fifty Six Thousand Seven Hundred Eighty Nine"
        );
        assert_eq!(number_in_words(150_00_00_000), "One Hundred Fifty Crore");
        assert_eq!(number_in_words(1_005), "One Thousand Five");
    }

    #[test]
    fn test_paise_rounding() {
        assert_eq!(amount_in_words(0.999), "One");
        assert_eq!(amount_in_words(0.05), "Zero and Five Paise");
        assert_eq!(amount_in_words(-3.0), "Zero");
        assert_eq!(amount_in_words(f64::NAN), "Zero");
    }
}
