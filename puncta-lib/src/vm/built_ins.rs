//! The actions every executor starts with

use super::actions::{ActionError, ActionResult};
use super::memory::Context;
use crate::core::*;
use crate::eval::{bank_slot, evaluate_with, Bank, Limits, BANK_SIZE};

pub type BuiltinFn = fn(&mut Context<'_>, &mut Value) -> ActionResult;

/// the longest formula `eval` accepts
pub const EVAL_BUFFER_CAP: usize = 9;

macro_rules! builtins {
    ($($name:ident),* $(,)?) => {
        &[$((stringify!($name), $name as BuiltinFn)),*]
    };
}

pub const BUILTINS: &[(&str, BuiltinFn)] = builtins![
    inc, dec, double, halve, neg, abs, not, isodd, isneg, toint, input, print, putn, getc, putc,
    gets, puts, putl, putx, eval,
];

/// an integer result, or the float fallback if the integer operation overflowed
fn int_or(res: Option<i64>, fallback: f64) -> Value {
    res.map(Value::Int).unwrap_or(Value::Float(fallback))
}

fn flag(b: bool) -> Value {
    Value::Int(b as i64)
}

// ==============================================================================
// Arithmetic
// ==============================================================================

fn inc(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => int_or(n.checked_add(1), n as f64 + 1.0),
        Number::Float(x) => Value::Float(x + 1.0),
    };
    Ok(())
}

fn dec(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => int_or(n.checked_sub(1), n as f64 - 1.0),
        Number::Float(x) => Value::Float(x - 1.0),
    };
    Ok(())
}

fn double(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => int_or(n.checked_mul(2), n as f64 * 2.0),
        Number::Float(x) => Value::Float(x * 2.0),
    };
    Ok(())
}

fn halve(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => Value::Int(n / 2),
        Number::Float(x) => Value::Float(x / 2.0),
    };
    Ok(())
}

fn neg(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => int_or(n.checked_neg(), -(n as f64)),
        Number::Float(x) => Value::Float(-x),
    };
    Ok(())
}

fn abs(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => int_or(n.checked_abs(), (n as f64).abs()),
        Number::Float(x) => Value::Float(x.abs()),
    };
    Ok(())
}

fn not(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = flag(v.to_i64()? == 0);
    Ok(())
}

fn isodd(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = flag(v.to_i64()? % 2 != 0);
    Ok(())
}

fn isneg(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match v.expect_number()? {
        Number::Int(n) => flag(n < 0),
        Number::Float(x) if x.is_nan() => return Err(ValueError::NaN.into()),
        Number::Float(x) => flag(x < 0.0),
    };
    Ok(())
}

fn toint(_: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = Value::Int(v.to_i64()?);
    Ok(())
}

// ==============================================================================
// Input and output
// ==============================================================================

/// Reads a number: a float, a decimal integer, or a hex integer with a `0x` prefix
pub fn parse_input(text: &str) -> Result<Value, ActionError> {
    let invalid = || ActionError::InvalidInput(text.to_string());
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let n = u64::from_str_radix(hex, 16).map_err(|_| invalid())? as i64;
        return Ok(Value::Int(if negative { n.wrapping_neg() } else { n }));
    }
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<i64>().map(Value::Int).map_err(|_| invalid());
    }
    match text.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(Value::Float(x)),
        _ => Err(invalid()),
    }
}

/// the line without its terminator, `EndOfInput` if there is none
fn read_input_line(ctx: &mut Context<'_>) -> Result<Vec<u8>, ActionError> {
    let mut line = ctx.read_line()?.ok_or(ActionError::EndOfInput)?;
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(line)
}

fn input(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    ctx.write(b">")?;
    let line = read_input_line(ctx)?;
    *v = parse_input(String::from_utf8_lossy(&line).trim())?;
    Ok(())
}

fn print(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    writeln!(ctx.out(), "{}", v)?;
    Ok(())
}

fn putn(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    write!(ctx.out(), "{}", v)?;
    Ok(())
}

fn getc(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    *v = match ctx.read_line()? {
        Some(line) => {
            let first = String::from_utf8_lossy(&line).chars().next();
            Value::Int(first.map_or(-1, |c| c as i64))
        }
        None => Value::Int(-1),
    };
    Ok(())
}

fn putc(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    let n = v.to_i64()?;
    let c = u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .ok_or(ActionError::InvalidChar(n))?;
    write!(ctx.out(), "{}", c)?;
    Ok(())
}

fn gets(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    let line = read_input_line(ctx)?;
    *v = Value::Str(pack_bytes(&line)?);
    Ok(())
}

/// the text of a string, or the bytes of an integer up to the first zero byte
fn text_bytes(v: &Value) -> Result<Vec<u8>, ActionError> {
    match v {
        Value::Str(s) => Ok(unpack_bytes(s)),
        Value::Int(n) => Ok(unpack_bytes(&PackedStr::from_slot(*n))),
        Value::Float(_) => Err(ValueError::TypeMismatch {
            expected: "a string or an integer",
            found: v.type_name(),
        }
        .into()),
    }
}

fn puts(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    let bytes = text_bytes(v)?;
    ctx.write(&bytes)?;
    Ok(())
}

fn putl(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    let mut bytes = text_bytes(v)?;
    bytes.push(b'\n');
    ctx.write(&bytes)?;
    Ok(())
}

fn putx(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    write!(ctx.out(), "{:016x}", v.to_i64()? as u64)?;
    Ok(())
}

// ==============================================================================
// eval
// ==============================================================================

/// Evaluates the variable's text as a formula. Letters read the variables of the same name
fn eval(ctx: &mut Context<'_>, v: &mut Value) -> ActionResult {
    let bytes = text_bytes(v)?;
    if bytes.len() > EVAL_BUFFER_CAP {
        return Err(ActionError::BufferTooSmall {
            len: bytes.len(),
            cap: EVAL_BUFFER_CAP,
        });
    }
    let formula = String::from_utf8_lossy(&bytes);
    let mut bank: Bank = [0.0; BANK_SIZE];
    for c in formula.chars() {
        let Some(slot) = bank_slot(c) else {
            continue;
        };
        let name = c.to_string();
        let value = ctx.get(&name).ok_or(ActionError::VariableNotFound(name))?;
        bank[slot] = value.to_f64()?;
    }
    let res = evaluate_with(&formula, &bank, Limits::for_len(EVAL_BUFFER_CAP))?;
    *v = Value::Float(res);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ErrorKind;
    use crate::vm::memory::{tests::test_io, Variables};

    fn call_with(
        f: BuiltinFn,
        v: Value,
        input: &str,
        vars: &mut Variables,
    ) -> (ActionResult, Value, String) {
        let (mut io, out) = test_io(input);
        let mut v = v;
        let res = f(&mut Context::new(vars, &mut io, 1), &mut v);
        (res, v, out.contents())
    }

    fn call(f: BuiltinFn, v: Value, input: &str) -> (ActionResult, Value, String) {
        call_with(f, v, input, &mut Variables::new())
    }

    fn apply(f: BuiltinFn, v: Value) -> Value {
        let (res, v, _) = call(f, v, "");
        res.unwrap();
        v
    }

    fn text(s: &str) -> Value {
        Value::Str(pack_bytes(s.as_bytes()).unwrap())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(apply(inc, Value::Int(1)), Value::Int(2));
        assert_eq!(apply(dec, Value::Float(1.5)), Value::Float(0.5));
        assert_eq!(apply(double, Value::Int(-4)), Value::Int(-8));
        assert_eq!(apply(halve, Value::Int(-5)), Value::Int(-2));
        assert_eq!(apply(halve, Value::Float(-5.0)), Value::Float(-2.5));
        assert_eq!(apply(neg, Value::Int(3)), Value::Int(-3));
        assert_eq!(apply(abs, Value::Float(-0.25)), Value::Float(0.25));
        assert_eq!(apply(inc, text("a")), Value::Int(98));
    }

    #[test]
    fn test_overflow_promotes() {
        assert_eq!(
            apply(inc, Value::Int(i64::MAX)),
            Value::Float(9_223_372_036_854_775_808.0)
        );
        assert_eq!(
            apply(abs, Value::Int(i64::MIN)),
            Value::Float(9_223_372_036_854_775_808.0)
        );
        assert!(matches!(apply(double, Value::Int(i64::MIN)), Value::Float(_)));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(apply(not, Value::Int(0)), Value::Int(1));
        assert_eq!(apply(not, Value::Float(0.5)), Value::Int(1));
        assert_eq!(apply(not, Value::Int(7)), Value::Int(0));
        assert_eq!(apply(isodd, Value::Int(-3)), Value::Int(1));
        assert_eq!(apply(isneg, Value::Float(-0.1)), Value::Int(1));
        assert_eq!(apply(toint, Value::Float(-2.9)), Value::Int(-2));
        assert!(matches!(
            call(isneg, Value::Float(f64::NAN), "").0,
            Err(ActionError::Value(ValueError::NaN))
        ));
        assert!(matches!(
            call(isodd, Value::Float(f64::INFINITY), "").0,
            Err(ActionError::Value(ValueError::NotFinite(_)))
        ));
        assert!(matches!(
            call(toint, Value::Float(1e19), "").0,
            Err(ActionError::Value(ValueError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("42").unwrap(), Value::Int(42));
        assert_eq!(parse_input("-7").unwrap(), Value::Int(-7));
        assert_eq!(parse_input("0x1F").unwrap(), Value::Int(31));
        assert_eq!(parse_input("-0x10").unwrap(), Value::Int(-16));
        assert_eq!(parse_input("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(parse_input("1e3").unwrap(), Value::Float(1000.0));
        for bad in ["", "abc", "0x", "0xZZ", "99999999999999999999", "inf", "1.2.3"] {
            assert!(
                matches!(parse_input(bad), Err(ActionError::InvalidInput(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_input() {
        let (res, v, out) = call(input, Value::Int(0), " 21 \n");
        res.unwrap();
        assert_eq!(v, Value::Int(21));
        assert_eq!(out, ">");
        let (res, _, _) = call(input, Value::Int(0), "");
        assert!(matches!(res, Err(ActionError::EndOfInput)));
    }

    #[test]
    fn test_print() {
        assert_eq!(call(print, Value::Float(-2.5), "").2, "-2.500000\n");
        assert_eq!(call(putn, Value::Int(14), "").2, "14");
        assert_eq!(call(print, text("hi"), "").2, "hi\n");
        assert_eq!(call(putx, Value::Int(65), "").2, "0000000000000041");
        assert_eq!(call(putx, Value::Int(-1), "").2, "ffffffffffffffff");
    }

    #[test]
    fn test_chars() {
        let (res, v, _) = call(getc, Value::Int(0), "xyz\nnext\n");
        res.unwrap();
        assert_eq!(v, Value::Int('x' as i64));
        assert_eq!(apply(getc, Value::Int(0)), Value::Int(-1));
        assert_eq!(call(putc, Value::Int(65), "").2, "A");
        assert!(matches!(
            call(putc, Value::Int(0xD800), "").0,
            Err(ActionError::InvalidChar(0xD800))
        ));
    }

    #[test]
    fn test_getc_discards_rest_of_line() {
        let mut vars = Variables::new();
        let (mut io, _) = test_io("xyz\nnext\n");
        let mut c = Value::Int(0);
        let mut d = Value::Int(0);
        let mut e = Value::Int(0);
        let mut ctx = Context::new(&mut vars, &mut io, 1);
        getc(&mut ctx, &mut c).unwrap();
        getc(&mut ctx, &mut d).unwrap();
        getc(&mut ctx, &mut e).unwrap();
        assert_eq!(c, Value::Int('x' as i64));
        assert_eq!(d, Value::Int('n' as i64));
        assert_eq!(e, Value::Int(-1));
    }

    #[test]
    fn test_strings() {
        let (res, v, _) = call(gets, Value::Int(0), "hello\r\n");
        res.unwrap();
        assert_eq!(v, text("hello"));
        let (res, _, _) = call(gets, Value::Int(0), "much too long for this\n");
        assert!(matches!(
            res,
            Err(ActionError::Value(ValueError::StringTooLong { len: 22, cap: 14 }))
        ));
        assert_eq!(call(putl, text("hi"), "").2, "hi\n");
        assert_eq!(call(puts, Value::Int(0x6968), "").2, "hi");
        assert!(call(puts, Value::Float(1.0), "").0.is_err());
    }

    #[test]
    fn test_eval() {
        let mut vars = Variables::new();
        vars.insert("a".into(), Value::Int(3));
        vars.insert("b".into(), Value::Float(4.0));
        let (res, v, _) = call_with(eval, text("a*a+b*b"), "", &mut vars);
        res.unwrap();
        assert_eq!(v, Value::Float(25.0));

        let (res, _, _) = call_with(eval, text("a+c"), "", &mut vars);
        assert!(matches!(res, Err(ActionError::VariableNotFound(name)) if name == "c"));

        let (res, _, _) = call_with(eval, text("1+2+3+4+5"), "", &mut vars);
        res.unwrap();
        let (res, _, _) = call_with(eval, text("1+2+3+4+56"), "", &mut vars);
        assert!(matches!(
            res,
            Err(ActionError::BufferTooSmall { len: 10, cap: 9 })
        ));

        let (res, _, _) = call_with(eval, text("a/0"), "", &mut vars);
        assert!(matches!(
            res,
            Err(ActionError::Eval(e)) if e.kind == ErrorKind::DivisionByZero
        ));
    }
}
