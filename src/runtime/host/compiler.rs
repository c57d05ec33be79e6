use crate::cl;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub(super) struct ArgSig {
    pub(super) name: String,
    pub(super) type_name: String,
    pub(super) address: u32,
    pub(super) access: u32,
    pub(super) type_qualifier: u64,
}

impl ArgSig {
    pub(super) fn is_pointer(&self) -> bool {
        self.type_name.ends_with('*')
    }
    pub(super) fn is_sampler(&self) -> bool {
        self.type_name == "sampler_t"
    }
    pub(super) fn is_image(&self) -> bool {
        self.type_name.starts_with("image")
    }
    /// Size in bytes of a by-value argument of a builtin scalar or vector type.
    pub(super) fn value_size(&self) -> Option<usize> {
        let name = self.type_name.as_str();
        let split = name
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(name.len());
        let (base, width) = name.split_at(split);
        let width = match width {
            "" => 1,
            "2" => 2,
            "3" | "4" => 4,
            "8" => 8,
            "16" => 16,
            _ => return None,
        };
        let size = match base {
            "bool" | "char" | "uchar" | "unsigned char" => 1,
            "short" | "ushort" | "unsigned short" | "half" => 2,
            "int" | "uint" | "unsigned int" | "unsigned" | "float" => 4,
            "long" | "ulong" | "unsigned long" | "double" => 8,
            "size_t" | "ptrdiff_t" | "intptr_t" | "uintptr_t" => std::mem::size_of::<usize>(),
            _ => return None,
        };
        Some(size * width)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub(super) struct KernelSig {
    pub(super) name: String,
    pub(super) args: Vec<ArgSig>,
    pub(super) attributes: String,
}

/// A program binary as produced by the host runtime.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Binary {
    pub(super) device: String,
    pub(super) options: String,
    pub(super) binary_type: u32,
    pub(super) kernels: Vec<KernelSig>,
}

const MAGIC: &[u8; 8] = b"CLKITBIN";

impl Binary {
    pub(super) fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }
    pub(super) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let payload = bytes.strip_prefix(MAGIC.as_slice())?;
        bincode::deserialize(payload).ok()
    }
}

/// Checks build options, tokens other than option values must start with '-'.
pub(super) fn check_options(options: &str) -> bool {
    let mut expect_value = false;
    for token in options.split_whitespace() {
        if expect_value {
            expect_value = false;
        } else if token == "-D" || token == "-I" {
            expect_value = true;
        } else if !token.starts_with('-') {
            return false;
        }
    }
    !expect_value
}

/// Replaces `#include` lines with the sources of the named headers, given as (name, source).
///
/// On failure returns the compile log.
pub(super) fn expand_includes(source: &str, headers: &[(String, String)]) -> Result<String, String> {
    let mut text = String::with_capacity(source.len());
    let mut log = String::new();
    for (i, line) in source.lines().enumerate() {
        let include = line
            .trim_start()
            .strip_prefix('#')
            .and_then(|directive| directive.trim_start().strip_prefix("include"));
        match include {
            Some(rest) => {
                let name = rest.trim().trim_matches(|c| matches!(c, '"' | '<' | '>'));
                match headers.iter().find(|(header, _)| header == name) {
                    Some((_, header)) => text.push_str(header),
                    None => {
                        let _ = writeln!(log, "<source>:{}: fatal error: '{name}' file not found", i + 1);
                    }
                }
            }
            None => text.push_str(line),
        }
        text.push('\n');
    }
    if log.is_empty() {
        Ok(text)
    } else {
        Err(log)
    }
}

/// Extracts the kernel signatures of `source`.
///
/// On failure returns the build log.
pub(super) fn compile(source: &str) -> Result<Vec<KernelSig>, String> {
    let text = strip_comments(source);
    let mut log = String::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix('#') {
            if let Some(message) = rest.trim_start().strip_prefix("error") {
                let _ = writeln!(log, "<source>:{}: error: {}", i + 1, message.trim());
            }
        }
    }
    if let Err(message) = check_delimiters(&text) {
        let _ = writeln!(log, "{message}");
    }
    if !log.is_empty() {
        return Err(log);
    }
    let tokens = tokenize(&text);
    let mut kernels = Vec::<KernelSig>::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].text.as_str() {
            "{" => depth += 1,
            "}" => depth = depth.saturating_sub(1),
            "__kernel" | "kernel" if depth == 0 => {
                let line = tokens[i].line;
                match parse_kernel(&tokens, i + 1) {
                    Ok((kernel, next)) => {
                        if kernels.iter().any(|k| k.name == kernel.name) {
                            let _ = writeln!(
                                log,
                                "<source>:{line}: error: redefinition of kernel '{}'",
                                kernel.name
                            );
                        } else {
                            kernels.push(kernel);
                        }
                        i = next;
                        continue;
                    }
                    Err(message) => {
                        let _ = writeln!(log, "<source>:{line}: error: {message}");
                        break;
                    }
                }
            }
            _ => (),
        }
        i += 1;
    }
    if log.is_empty() {
        Ok(kernels)
    } else {
        Err(log)
    }
}

struct Token {
    text: String,
    line: usize,
}

fn strip_comments(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'/') {
            for c in chars.by_ref() {
                if c == '\n' {
                    output.push('\n');
                    break;
                }
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for c in chars.by_ref() {
                if c == '\n' {
                    output.push('\n');
                }
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            output.push(' ');
        } else {
            output.push(c);
        }
    }
    output
}

fn check_delimiters(text: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        for c in line.chars() {
            match c {
                '(' | '{' | '[' => stack.push((c, i + 1)),
                ')' | '}' | ']' => {
                    let open = match c {
                        ')' => '(',
                        '}' => '{',
                        _ => '[',
                    };
                    match stack.pop() {
                        Some((x, _)) if x == open => (),
                        _ => return Err(format!("<source>:{}: error: unexpected '{c}'", i + 1)),
                    }
                }
                _ => (),
            }
        }
    }
    if let Some((c, line)) = stack.pop() {
        return Err(format!("<source>:{line}: error: unmatched '{c}'"));
    }
    Ok(())
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let mut chars = line.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            let text = if c.is_ascii_alphanumeric() || c == '_' {
                let mut end = start + c.len_utf8();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                line[start..end].to_string()
            } else {
                c.to_string()
            };
            tokens.push(Token { text, line: i + 1 });
        }
    }
    tokens
}

fn is_ident(token: &str) -> bool {
    token
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
}

/// Skips a parenthesized group starting at `i`, returns the index after it.
fn skip_group(tokens: &[Token], mut i: usize) -> usize {
    let mut depth = 0usize;
    while i < tokens.len() {
        match tokens[i].text.as_str() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => (),
        }
        i += 1;
    }
    i
}

fn parse_kernel(tokens: &[Token], mut i: usize) -> Result<(KernelSig, usize), String> {
    let mut attributes = Vec::new();
    while tokens.get(i).map(|t| t.text.as_str()) == Some("__attribute__") {
        let end = skip_group(tokens, i + 1);
        let text: Vec<&str> = tokens[i..end].iter().map(|t| t.text.as_str()).collect();
        attributes.push(text.concat());
        i = end;
    }
    match tokens.get(i).map(|t| t.text.as_str()) {
        Some("void") => i += 1,
        Some(other) => return Err(format!("kernel must return void, found '{other}'")),
        None => return Err("expected kernel declaration".into()),
    }
    let name = match tokens.get(i) {
        Some(token) if is_ident(&token.text) => token.text.clone(),
        _ => return Err("expected kernel name".into()),
    };
    i += 1;
    if tokens.get(i).map(|t| t.text.as_str()) != Some("(") {
        return Err(format!("expected '(' after kernel name '{name}'"));
    }
    let end = skip_group(tokens, i);
    let inner = &tokens[i + 1..end.saturating_sub(1)];
    let mut args = Vec::new();
    let params: Vec<&[Token]> = inner.split(|t| t.text == ",").collect();
    let no_args = inner.is_empty() || (inner.len() == 1 && inner[0].text == "void");
    if !no_args {
        for param in params {
            args.push(parse_param(&name, param)?);
        }
    }
    Ok((
        KernelSig {
            name,
            args,
            attributes: attributes.join(" "),
        },
        end,
    ))
}

fn parse_param(kernel: &str, tokens: &[Token]) -> Result<ArgSig, String> {
    let mut address = None;
    let mut access = None;
    let mut type_qualifier = cl::KERNEL_ARG_TYPE_NONE;
    let mut words = Vec::new();
    let mut pointer = false;
    for token in tokens {
        match token.text.as_str() {
            "__global" | "global" => address = Some(cl::KERNEL_ARG_ADDRESS_GLOBAL),
            "__local" | "local" => address = Some(cl::KERNEL_ARG_ADDRESS_LOCAL),
            "__constant" | "constant" => address = Some(cl::KERNEL_ARG_ADDRESS_CONSTANT),
            "__private" | "private" => address = Some(cl::KERNEL_ARG_ADDRESS_PRIVATE),
            "__read_only" | "read_only" => access = Some(cl::KERNEL_ARG_ACCESS_READ_ONLY),
            "__write_only" | "write_only" => access = Some(cl::KERNEL_ARG_ACCESS_WRITE_ONLY),
            "__read_write" | "read_write" => access = Some(cl::KERNEL_ARG_ACCESS_READ_WRITE),
            "const" => type_qualifier |= cl::KERNEL_ARG_TYPE_CONST,
            "restrict" | "__restrict" => type_qualifier |= cl::KERNEL_ARG_TYPE_RESTRICT,
            "volatile" => type_qualifier |= cl::KERNEL_ARG_TYPE_VOLATILE,
            "*" => pointer = true,
            word if is_ident(word) => words.push(word),
            other => return Err(format!("unexpected '{other}' in parameters of kernel '{kernel}'")),
        }
    }
    if words.len() < 2 {
        return Err(format!("parameter of kernel '{kernel}' must have a type and a name"));
    }
    let name = words.pop().unwrap_or_default().to_string();
    let mut type_name = words.join(" ");
    if pointer {
        type_name.push('*');
    }
    let address = match address {
        Some(address) => address,
        None if pointer => {
            return Err(format!(
                "pointer parameter '{name}' of kernel '{kernel}' must be global, constant or local"
            ))
        }
        None => cl::KERNEL_ARG_ADDRESS_PRIVATE,
    };
    let access = match access {
        Some(access) => access,
        None if type_name.starts_with("image") => cl::KERNEL_ARG_ACCESS_READ_ONLY,
        None => cl::KERNEL_ARG_ACCESS_NONE,
    };
    Ok(ArgSig {
        name,
        type_name,
        address,
        access,
        type_qualifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_signatures() {
        let source = r#"
            // two kernels
            __kernel void add(__global const float* a, __global const float* b,
                __global float* c, uint n) {
                size_t i = get_global_id(0);
                if (i < n) { c[i] = a[i] + b[i]; }
            }
            /* helper */
            float twice(float x) { return 2 * x; }
            kernel __attribute__((reqd_work_group_size(64, 1, 1))) void scratch(local int* tmp, read_only image2d_t img, sampler_t s) {}
            __kernel void k() {}
        "#;
        let kernels = compile(source).unwrap();
        let names: Vec<_> = kernels.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["add", "scratch", "k"]);
        let add = &kernels[0];
        assert_eq!(add.args.len(), 4);
        assert_eq!(add.args[0].type_name, "float*");
        assert_eq!(add.args[0].address, cl::KERNEL_ARG_ADDRESS_GLOBAL);
        assert_eq!(add.args[0].type_qualifier, cl::KERNEL_ARG_TYPE_CONST);
        assert_eq!(add.args[3].name, "n");
        assert_eq!(add.args[3].value_size(), Some(4));
        let scratch = &kernels[1];
        assert!(scratch.attributes.contains("reqd_work_group_size"));
        assert_eq!(scratch.args[0].address, cl::KERNEL_ARG_ADDRESS_LOCAL);
        assert!(scratch.args[1].is_image());
        assert_eq!(scratch.args[1].access, cl::KERNEL_ARG_ACCESS_READ_ONLY);
        assert!(scratch.args[2].is_sampler());
        assert!(kernels[2].args.is_empty());
    }

    #[test]
    fn compile_errors() {
        let log = compile("#error missing feature\n__kernel void k() {}").unwrap_err();
        assert!(log.contains("<source>:1: error: missing feature"));
        let log = compile("__kernel void k( {}").unwrap_err();
        assert!(log.contains("error"));
        let log = compile("__kernel int k() {}").unwrap_err();
        assert!(log.contains("must return void"));
        let log = compile("__kernel void k(float* x) {}").unwrap_err();
        assert!(log.contains("must be global"));
        let log = compile("__kernel void k() {}\n__kernel void k() {}").unwrap_err();
        assert!(log.contains("redefinition"));
    }

    #[test]
    fn includes() {
        let headers = [("util.h".to_string(), "float twice(float x) { return 2 * x; }".to_string())];
        let text = expand_includes("#include \"util.h\"\n__kernel void k() {}", &headers).unwrap();
        assert!(text.starts_with("float twice"));
        assert_eq!(compile(&text).unwrap().len(), 1);
        let log = expand_includes("\n# include <missing.h>", &headers).unwrap_err();
        assert!(log.contains("<source>:2: fatal error: 'missing.h' file not found"));
    }

    #[test]
    fn build_options() {
        assert!(check_options(""));
        assert!(check_options("-cl-fast-relaxed-math -D N=4 -DM=2 -I include"));
        assert!(!check_options("fast"));
        assert!(!check_options("-D"));
    }

    #[test]
    fn value_sizes() {
        let arg = |type_name: &str| ArgSig {
            name: "x".into(),
            type_name: type_name.into(),
            address: cl::KERNEL_ARG_ADDRESS_PRIVATE,
            access: cl::KERNEL_ARG_ACCESS_NONE,
            type_qualifier: 0,
        };
        assert_eq!(arg("float4").value_size(), Some(16));
        assert_eq!(arg("int3").value_size(), Some(16));
        assert_eq!(arg("uchar").value_size(), Some(1));
        assert_eq!(arg("struct params").value_size(), None);
    }

    #[test]
    fn binary_bytes() {
        let binary = Binary {
            device: "host".into(),
            options: String::new(),
            binary_type: cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT,
            kernels: compile("__kernel void k(__global int* x) {}").unwrap(),
        };
        let bytes = binary.to_bytes().unwrap();
        assert!(bytes.starts_with(MAGIC));
        let decoded = Binary::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.kernels, binary.kernels);
        assert_eq!(decoded.binary_type, cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT);
        assert!(Binary::from_bytes(b"not a binary").is_none());
    }
}
