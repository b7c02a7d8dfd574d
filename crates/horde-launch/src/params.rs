//! Context, generation and performance parameters.

use std::fmt;
use std::io::{BufRead, Write};
use tracing::debug;

use crate::config::LaunchDefaults;
use crate::console::Console;
use crate::error::LaunchError;

/// Ordered menu of allowed context sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCatalog {
    sizes: Vec<u32>,
}

impl ContextCatalog {
    pub fn new(sizes: Vec<u32>) -> Self {
        Self { sizes }
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Interpret a menu answer.
    ///
    /// Empty picks `default`, `1..=len` picks that entry, anything else is
    /// rejected.
    pub fn choose(&self, answer: &str, default: u32) -> Result<u32, String> {
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=self.sizes.len()).contains(&n) => Ok(self.sizes[n - 1]),
            _ => Err(format!(
                "Invalid selection '{}'. Enter a number between 1 and {}, or press Enter for {}.",
                answer,
                self.sizes.len(),
                default
            )),
        }
    }
}

/// The two independently chosen context sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSizes {
    /// Context the local server allocates.
    pub local: u32,
    /// Context advertised to the Horde.
    pub horde: u32,
}

/// Show the context menu and return the chosen size.
pub fn select_context<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &ContextCatalog,
    default: u32,
    label: &str,
) -> Result<u32, LaunchError> {
    console.say(format_args!("{}:", label))?;
    for (i, size) in catalog.sizes().iter().enumerate() {
        console.say(format_args!("  {:>2}) {}", i + 1, size))?;
    }
    let prompt = format!("Select [1-{}, Enter for {}]: ", catalog.sizes().len(), default);
    let size = console.ask_until(&prompt, |answer| catalog.choose(answer, default))?;
    debug!("{}: {}", label, size);
    Ok(size)
}

/// Ask for the Horde generation length.
///
/// Any non-empty answer is passed to the server as typed.
pub fn collect_gen_length<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    default: &str,
) -> Result<String, LaunchError> {
    let answer = console.ask(&format!("Max generation length [{}]: ", default))?;
    Ok(or_default(answer, default))
}

fn or_default(answer: String, default: &str) -> String {
    if answer.is_empty() {
        default.to_string()
    } else {
        answer
    }
}

/// GPU tensor split proportions, kept as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSplit {
    parts: Vec<String>,
}

impl TensorSplit {
    /// Parse a whitespace-separated list of decimals.
    ///
    /// Empty input means "no split".
    pub fn parse(input: &str) -> Result<Option<Self>, String> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(None);
        }
        if let Some(bad) = parts.iter().find(|part| !is_decimal(part)) {
            return Err(format!(
                "Invalid tensor split value '{}'. Use space-separated numbers like '0.5 0.5'.",
                bad
            ));
        }
        Ok(Some(Self {
            parts: parts.into_iter().map(str::to_string).collect(),
        }))
    }

    /// Values as passed on the command line.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Numeric values of the split.
    #[cfg(test)]
    pub(crate) fn values(&self) -> Vec<f64> {
        self.parts
            .iter()
            .filter_map(|part| part.parse().ok())
            .collect()
    }
}

impl fmt::Display for TensorSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" "))
    }
}

/// Digits with at most one decimal point, e.g. `3`, `0.5`, `.25`, `2.`.
fn is_decimal(s: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Performance switches for the server.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedParams {
    pub tensor_split: Option<TensorSplit>,
    pub gpu_layers: String,
    pub row_split: bool,
    pub flash_attention: bool,
    pub quant_kv: bool,
    pub preload: bool,
    pub port: String,
}

impl AdvancedParams {
    /// Settings used when the operator skips the advanced options.
    pub fn preset(defaults: &LaunchDefaults) -> Self {
        Self {
            tensor_split: None,
            gpu_layers: defaults.gpu_layers.clone(),
            row_split: true,
            flash_attention: true,
            quant_kv: false,
            preload: false,
            port: defaults.port.clone(),
        }
    }
}

/// Ask whether to tune the advanced options and, if so, ask for each one.
pub fn collect_advanced<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    defaults: &LaunchDefaults,
) -> Result<AdvancedParams, LaunchError> {
    let preset = AdvancedParams::preset(defaults);
    if !console.confirm("Configure advanced options?")? {
        return Ok(preset);
    }

    let tensor_split = console.ask_until(
        "Tensor split (e.g. '0.5 0.5', Enter for none): ",
        TensorSplit::parse,
    )?;
    let gpu_layers = or_default(
        console.ask(&format!("GPU layers [{}]: ", preset.gpu_layers))?,
        &preset.gpu_layers,
    );
    let row_split = !console.confirm("Disable row split?")?;
    let flash_attention = !console.confirm("Disable flash attention?")?;
    let quant_kv = console.confirm("Enable quantized KV cache?")?;
    let preload = console.confirm("Enable preload (lock model in RAM)?")?;
    let port = or_default(
        console.ask(&format!("Port [{}]: ", preset.port))?,
        &preset.port,
    );

    Ok(AdvancedParams {
        tensor_split,
        gpu_layers,
        row_split,
        flash_attention,
        quant_kv,
        preload,
        port,
    })
}
