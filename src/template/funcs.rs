//! Functions callable from templates

use serde_json::Value;

use crate::core::error::TemplateError;

use super::exec::print_value;

const FUNCS: &[&str] = &["json", "yaml", "indent", "upper", "lower"];

/// Widest indent accepted from a template
const MAX_INDENT: u64 = 1024;

pub(crate) fn exists(name: &str) -> bool {
    FUNCS.contains(&name)
}

pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
    match name {
        "json" => {
            let [value] = expect_args::<1>(name, args)?;
            serde_json::to_string(&value)
                .map(Value::String)
                .map_err(|e| TemplateError::Execute(format!("json: {}", e)))
        }
        "yaml" => {
            let [value] = expect_args::<1>(name, args)?;
            let doc = serde_yaml::to_string(&value)
                .map_err(|e| TemplateError::Execute(format!("yaml: {}", e)))?;
            Ok(Value::String(format!("---\n{}", doc.trim_end_matches('\n'))))
        }
        "indent" => indent(args),
        "upper" => {
            let [value] = expect_args::<1>(name, args)?;
            Ok(Value::String(print_value(&value).to_uppercase()))
        }
        "lower" => {
            let [value] = expect_args::<1>(name, args)?;
            Ok(Value::String(print_value(&value).to_lowercase()))
        }
        _ => Err(TemplateError::Execute(format!(
            "function {:?} not defined",
            name
        ))),
    }
}

/// `indent [N] TEXT`: prefix every line with N spaces (default 2)
fn indent(mut args: Vec<Value>) -> Result<Value, TemplateError> {
    let width = match args.len() {
        1 => 2,
        2 => match args.remove(0) {
            Value::Number(n) => match n.as_u64() {
                Some(width) if width <= MAX_INDENT => width as usize,
                Some(width) => {
                    return Err(TemplateError::Execute(format!(
                        "indent: width {} too large",
                        width
                    )))
                }
                None => return Err(TemplateError::Execute(format!("indent: bad width {}", n))),
            },
            other => {
                return Err(TemplateError::Execute(format!(
                    "indent: width must be a number, got {}",
                    print_value(&other)
                )))
            }
        },
        n => {
            return Err(TemplateError::Execute(format!(
                "wrong number of args for indent: want 1 or 2 got {}",
                n
            )))
        }
    };
    let text = print_value(&args[0]);
    let pad = " ".repeat(width);
    let indented: Vec<String> = text
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect();
    Ok(Value::String(indented.join("\n")))
}

fn expect_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], TemplateError> {
    let got = args.len();
    args.try_into().map_err(|_| {
        TemplateError::Execute(format!(
            "wrong number of args for {}: want {} got {}",
            name, N, got
        ))
    })
}
