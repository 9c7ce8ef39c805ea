/// Knobs for the Rust emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    /// Crate path of the reflection runtime the generated code binds to.
    pub runtime: String,
    /// Emit the `@generated` banner at the top of the file.
    pub header:  bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            runtime: "lightproto".to_string(),
            header:  true,
        }
    }
}

impl EmitOptions {
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Absolute path of the runtime's reflection module.
    pub fn reflection_path(&self) -> String {
        format!("::{}::reflection", self.runtime.trim_start_matches("::"))
    }
}
