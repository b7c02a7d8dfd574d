//! Server invocation builder.

use std::path::Path;

use crate::config::RuntimeConfig;
use crate::models::ModelSelection;
use crate::params::{AdvancedParams, ContextSizes};
use crate::paths::is_python_script;

/// Everything the server invocation is derived from.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub config: &'a RuntimeConfig,
    pub model: &'a ModelSelection,
    pub context: ContextSizes,
    pub gen_length: &'a str,
    pub advanced: &'a AdvancedParams,
    /// Arguments given to the launcher, forwarded untouched.
    pub extra_args: &'a [String],
}

/// A fully-formed server invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    program: String,
    args: Vec<String>,
}

impl LaunchCommand {
    /// Build the server invocation. The same request always yields the same command.
    pub fn build(request: &LaunchRequest<'_>) -> Self {
        let config = request.config;
        let advanced = request.advanced;
        let server = config.server_path();

        let (program, mut args) = if is_python_script(server) {
            (config.defaults().python.clone(), vec![path_arg(server)])
        } else {
            (path_arg(server), Vec::new())
        };

        args.push("--multiuser".to_string());
        args.push("--usecublas".to_string());
        args.push("normal".to_string());
        if advanced.row_split {
            args.push("rowsplit".to_string());
        }
        if advanced.flash_attention {
            args.push("--flashattention".to_string());
        }
        if advanced.quant_kv {
            args.extend(["--quantkv".to_string(), "1".to_string()]);
        }
        if advanced.preload {
            args.push("--usemlock".to_string());
        }

        let mut flag = |name: &str, value: String| {
            args.push(name.to_string());
            args.push(value);
        };
        flag("--gpulayers", advanced.gpu_layers.clone());
        flag("--port", advanced.port.clone());
        flag("--model", path_arg(&request.model.path));
        flag("--contextsize", request.context.local.to_string());
        if let Some(name) = &request.model.public_name {
            flag("--hordemodelname", name.clone());
        }
        flag("--hordekey", config.api_key().to_string());
        flag("--hordeworkername", config.worker_name().to_string());
        flag("--hordegenlen", request.gen_length.to_string());
        flag("--hordemaxctx", request.context.horde.to_string());

        if let Some(split) = &advanced.tensor_split {
            args.push("--tensor_split".to_string());
            args.extend(split.parts().iter().cloned());
        }

        args.extend(request.extra_args.iter().cloned());

        Self { program, args }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Render as one shell line, quoting arguments that need it.
    pub fn to_shell_line(&self) -> String {
        shell_words::join(self.argv())
    }

    /// Shell line with the API key replaced, for logs and screens.
    pub fn to_redacted_line(&self) -> String {
        let mut redact_next = false;
        let words = self.argv().into_iter().map(|word| {
            let shown = if redact_next { "****" } else { word };
            redact_next = word == "--hordekey";
            shown
        });
        shell_words::join(words)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
