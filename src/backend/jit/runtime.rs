use std::borrow::Cow;
use std::ffi::{CStr, c_char};
use std::slice;

use cranelift_jit::JITBuilder;

use crate::backend::BackendError;

pub(super) const PRINT_SYMBOL: &str = "brainrot_print";

/// Signature of the finalized entry function: runtime context in, status out.
pub(super) type EntryFn = extern "C" fn(*mut Runtime) -> i64;

/// Result of one execution of a prepared program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub output: String,
    pub status: i64,
}

/// Runtime state handed to emitted code as its hidden first argument.
#[derive(Debug, Default)]
pub(super) struct Runtime {
    output: String,
    error: Option<String>,
}

impl Runtime {
    pub(super) fn new() -> Self {
        Self::default()
    }

    fn set_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    pub(super) fn finish(self, status: i64) -> Result<Execution, BackendError> {
        if let Some(error) = self.error {
            return Err(BackendError::Runtime(error));
        }
        Ok(Execution {
            output: self.output,
            status,
        })
    }
}

pub(super) fn register_runtime_symbols(builder: &mut JITBuilder) {
    builder.symbol(PRINT_SYMBOL, brainrot_print as *const u8);
}

/// Formatted-output hook. `args` points at `count` 8-byte words: integers,
/// float bit patterns or string pointers, in directive order.
unsafe extern "C" fn brainrot_print(
    ctx: *mut Runtime,
    format: *const c_char,
    args: *const u64,
    count: i64,
) -> i64 {
    let runtime = unsafe { &mut *ctx };
    let format = unsafe { CStr::from_ptr(format) }.to_string_lossy();
    let args = if count <= 0 || args.is_null() {
        &[][..]
    } else {
        unsafe { slice::from_raw_parts(args, count as usize) }
    };

    let rendered = render_format(&format, args, |word| {
        let ptr = word as usize as *const c_char;
        if ptr.is_null() {
            Cow::Borrowed("")
        } else {
            unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
        }
    });
    match rendered {
        Ok(text) => {
            runtime.output.push_str(&text);
            text.len() as i64
        }
        Err(message) => {
            runtime.set_error(message);
            -1
        }
    }
}

/// Renders the printf-style directives `%d`, `%s`, `%f`, `%.Nf` and `%%`.
pub(super) fn render_format<'s>(
    format: &str,
    args: &[u64],
    string_at: impl Fn(u64) -> Cow<'s, str>,
) -> Result<String, String> {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter().copied();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            precision = Some(digits.parse::<usize>().unwrap_or(0));
        }

        let directive = chars
            .next()
            .ok_or_else(|| "format string ends inside a directive".to_string())?;
        if directive == '%' {
            out.push('%');
            continue;
        }
        let word = args
            .next()
            .ok_or_else(|| format!("missing argument for '%{directive}'"))?;
        match directive {
            'd' => out.push_str(&(word as i64).to_string()),
            's' => out.push_str(&string_at(word)),
            'f' => out.push_str(&format_float(f64::from_bits(word), precision.unwrap_or(6))),
            other => return Err(format!("unsupported format directive '%{other}'")),
        }
    }
    Ok(out)
}

fn format_float(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.precision$}")
    }
}
