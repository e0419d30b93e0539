//! Parser for algorithm expressions such as
//! `Open+Cvt(Gray)+NECLatent1Enroll(false,LFML):NECLatent1Compare(LFML)`.
//!
//! The part before `:` is a chain of transforms joined by `+`, the part after it
//! names the distance.

use crate::error::{Error, Result};

/// One plugin invocation: a name and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub transforms: Vec<Call>,
    pub distance: Option<Call>,
}

pub fn parse(expression: &str) -> Result<Expression> {
    let fail = |message: &str| Error::Parse {
        expression: expression.to_string(),
        message: message.to_string(),
    };

    let parts = split_top_level(expression, ':').map_err(|m| fail(&m))?;
    let (chain, distance) = match parts.as_slice() {
        [chain] => (*chain, None),
        [chain, distance] => (*chain, Some(*distance)),
        _ => return Err(fail("more than one ':'")),
    };

    let transforms = if chain.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(chain, '+')
            .map_err(|m| fail(&m))?
            .into_iter()
            .map(|c| parse_call(c).map_err(|m| fail(&m)))
            .collect::<Result<Vec<_>>>()?
    };

    let distance = match distance {
        Some(d) => Some(parse_call(d).map_err(|m| fail(&m))?),
        None => None,
    };

    if transforms.is_empty() && distance.is_none() {
        return Err(fail("empty expression"));
    }

    Ok(Expression {
        transforms,
        distance,
    })
}

fn split_top_level(s: &str, sep: char) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?
            }
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn parse_call(s: &str) -> std::result::Result<Call, String> {
    let s = s.trim();
    let (name, args) = match s.find('(') {
        Some(open) => {
            if !s.ends_with(')') {
                return Err(format!("trailing text after arguments in '{}'", s));
            }
            let inner = &s[open + 1..s.len() - 1];
            let args = if inner.trim().is_empty() {
                Vec::new()
            } else {
                split_top_level(inner, ',')?
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .collect()
            };
            (s[..open].trim(), args)
        }
        None => (s, Vec::new()),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid plugin name '{}'", name));
    }

    Ok(Call {
        name: name.to_string(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_algorithm() {
        let e = parse("Open+Cvt(Gray)+NECLatent1Enroll(false,LFML):NECLatent1Compare(LFML)").unwrap();
        let names: Vec<_> = e.transforms.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Open", "Cvt", "NECLatent1Enroll"]);
        assert_eq!(e.transforms[1].args, ["Gray"]);
        assert_eq!(e.transforms[2].args, ["false", "LFML"]);
        let d = e.distance.unwrap();
        assert_eq!(d.name, "NECLatent1Compare");
        assert_eq!(d.arg(0), Some("LFML"));
    }

    #[test]
    fn test_parse_ignores_whitespace() {
        let e = parse(" Open + Enroll( true , ELFT_M ) : Compare ").unwrap();
        assert_eq!(e.transforms[1].args, ["true", "ELFT_M"]);
        assert_eq!(e.distance.unwrap().args, Vec::<String>::new());
    }

    #[test]
    fn test_transform_only_chain() {
        let e = parse("Open+Cvt(Gray)").unwrap();
        assert_eq!(e.transforms.len(), 2);
        assert!(e.distance.is_none());
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "Open+Cvt(Gray", "Open)", "A:B:C", "Open+:Dist", "Bad-Name", "Cvt(Gray)x"] {
            assert!(
                matches!(parse(bad), Err(Error::Parse { .. })),
                "expected parse error for {:?}",
                bad
            );
        }
    }
}
