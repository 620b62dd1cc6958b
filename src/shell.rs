use anyhow::{Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::ExecError,
    parse::tokenize,
    process_exec::execute,
    prompt::Prompter,
    store::SnippetStore,
    template::{FieldValues, missing_fields, parse_fields, resolve},
};

/// Asks for a value for every field of `command`, in order.
pub fn collect_fields(command: &str, prompter: &mut dyn Prompter) -> Result<FieldValues> {
    let mut values = FieldValues::new();
    for field in parse_fields(command) {
        match prompter.ask(&format!("{field}: "))? {
            Some(value) => {
                values.insert(field, value);
            }
            None => bail!("no value given for '{field}'"),
        }
    }
    Ok(values)
}

/// Fills in placeholders and splits the result into program and arguments.
pub fn prepare(command: &str, values: &FieldValues) -> Result<Vec<String>> {
    let missing = missing_fields(command, values);
    if !missing.is_empty() {
        bail!("missing values for: {}", missing.join(", "));
    }

    let resolved = resolve(command, values);
    debug!(%resolved, "resolved snippet command");

    let tokens = tokenize(&resolved, false);
    if tokens.is_empty() {
        return Err(ExecError::InvalidCommand.into());
    }
    Ok(tokens)
}

/// Looks up `id` and turns it into program and arguments, asking for any
/// field values on the way.
pub async fn load(store: &dyn SnippetStore, id: &str, prompter: &mut dyn Prompter) -> Result<Vec<String>> {
    // Step 1: Fetch the snippet
    let snippet = store.get(id).await?;
    eprintln!("{}", snippet.display_text(false));

    // Step 2: Ask for placeholder values
    let values = collect_fields(&snippet.command, prompter)?;

    // Step 3: Resolve and tokenize
    prepare(&snippet.command, &values)
}

/// Runs a loaded snippet, streaming its output until it exits or `cancel` fires.
pub async fn run(tokens: &[String], cancel: &CancellationToken) -> Result<()> {
    execute(tokens, cancel).await?;
    Ok(())
}
