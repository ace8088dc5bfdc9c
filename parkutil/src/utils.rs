pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting() {
        assert_eq!(prettyprint_usize(0), "0");
        assert_eq!(prettyprint_usize(999), "999");
        assert_eq!(prettyprint_usize(1234567), "1,234,567");
    }
}
