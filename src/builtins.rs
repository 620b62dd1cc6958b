use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::{
    error::StoreError,
    prompt::Prompter,
    snippet::{Snippet, SnippetPatch, is_valid_id},
    store::SnippetStore,
};

/// How many times `add` asks for an id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 3;

pub async fn list(store: &dyn SnippetStore, out: &mut dyn Write, color: bool) -> Result<()> {
    let snippets = store.all().await?;
    if snippets.is_empty() {
        writeln!(out, "no snippets yet; add one with 'zei add'")?;
        return Ok(());
    }
    for snippet in snippets {
        writeln!(out, "{}", snippet.display_text(color))?;
    }
    Ok(())
}

pub async fn show(store: &dyn SnippetStore, id: &str, out: &mut dyn Write, color: bool) -> Result<()> {
    let snippet = store.get(id).await?;
    writeln!(out, "{}", snippet.display_text(color))?;
    Ok(())
}

fn ask_required(prompter: &mut dyn Prompter, label: &str) -> Result<String> {
    prompter
        .ask(label)?
        .with_context(|| format!("input closed while asking for {}", label.trim_end_matches(": ")))
}

async fn ask_id(store: &dyn SnippetStore, prompter: &mut dyn Prompter, out: &mut dyn Write) -> Result<String> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ask_required(prompter, "id (ex. some-id): ")?.trim().to_string();
        if !is_valid_id(&id) {
            writeln!(out, "'{id}' is not a valid id; use letters, digits, '_' or '-'")?;
            continue;
        }
        match store.get(&id).await {
            Err(StoreError::NotFound(_)) => return Ok(id),
            Err(e) => return Err(e.into()),
            Ok(_) => writeln!(out, "'{id}' is already taken")?,
        }
    }
    bail!("no valid id after {MAX_ID_ATTEMPTS} attempts")
}

pub async fn add(store: &dyn SnippetStore, prompter: &mut dyn Prompter, out: &mut dyn Write) -> Result<()> {
    let id = ask_id(store, prompter, out).await?;
    let command = ask_required(prompter, "command: ")?;
    if command.trim().is_empty() {
        bail!("command cannot be empty");
    }
    let description = ask_required(prompter, "description: ")?;

    let snippet = Snippet::new(id, command, description);
    writeln!(out, "\nNew snippet\n{}", snippet.display_text(false))?;

    if !prompter.confirm("Save?")? {
        writeln!(out, "not saved")?;
        return Ok(());
    }

    info!(id = %snippet.id, "adding snippet");
    store.create(snippet).await?;
    writeln!(out, "saved")?;
    Ok(())
}

pub async fn update(
    store: &dyn SnippetStore,
    id: &str,
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<()> {
    let current = store.get(id).await?;
    writeln!(out, "{}\n(leave empty to keep the current value)", current.display_text(false))?;

    let command = ask_required(prompter, &format!("command [{}]: ", current.command))?;
    let description = ask_required(prompter, &format!("description [{}]: ", current.description))?;

    let patch = SnippetPatch {
        command: Some(command).filter(|c| !c.trim().is_empty()),
        description: Some(description).filter(|d| !d.is_empty()),
    };
    if patch.is_empty() {
        writeln!(out, "nothing to change")?;
        return Ok(());
    }

    if !prompter.confirm("Save changes?")? {
        writeln!(out, "not saved")?;
        return Ok(());
    }

    info!(id, "updating snippet");
    let updated = store.update(id, patch).await?;
    writeln!(out, "{}", updated.display_text(false))?;
    Ok(())
}

pub async fn remove(
    store: &dyn SnippetStore,
    ids: &[String],
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<()> {
    if !prompter.confirm(&format!("Remove {}?", ids.join(", ")))? {
        writeln!(out, "nothing removed")?;
        return Ok(());
    }

    info!(?ids, "removing snippets");
    let removed = store.delete_many(ids).await?;
    writeln!(out, "removed {removed} of {}", ids.len())?;
    Ok(())
}

pub fn help() -> String {
    "\
zei - a command snippet manager

Usage:
  zei <id>                  run a snippet, asking for any {{field}} values
  zei list | ls             list snippets
  zei show <id>             show one snippet
  zei add                   add a snippet interactively
  zei update <id>           change a snippet's command or description
  zei remove | rm | del <id>...
                            remove snippets
  zei help                  show this help
  zei version               show the version

Quotes (\", ', `) keep text together as one argument. Placeholders are
written {{name}} and asked for when the snippet runs.
"
    .to_string()
}
