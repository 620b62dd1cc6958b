use anyhow::{Result, bail};

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    List,
    Add,
    Show(String),
    Update(String),
    Remove(Vec<String>),
    Run(String),
    Help,
    Version,
}

pub fn parse_args<I, S>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(Invocation::Help);
    };

    let invocation = match cmd.as_str() {
        "list" | "ls" => {
            no_more(cmd, rest)?;
            Invocation::List
        }
        "add" => {
            no_more(cmd, rest)?;
            Invocation::Add
        }
        "show" => Invocation::Show(one_id(cmd, rest)?),
        "update" => Invocation::Update(one_id(cmd, rest)?),
        "remove" | "rm" | "del" => {
            if rest.is_empty() {
                bail!("{cmd}: expected at least one id");
            }
            Invocation::Remove(rest.to_vec())
        }
        "help" | "-h" | "--help" => Invocation::Help,
        "version" | "-V" | "--version" => Invocation::Version,
        flag if flag.starts_with('-') => bail!("unknown option '{flag}'; try 'zei help'"),
        id => {
            if !rest.is_empty() {
                bail!("unexpected arguments after '{id}': {}", rest.join(" "));
            }
            Invocation::Run(id.to_string())
        }
    };
    Ok(invocation)
}

fn no_more(cmd: &str, rest: &[String]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        bail!("{cmd}: unexpected arguments: {}", rest.join(" "))
    }
}

fn one_id(cmd: &str, rest: &[String]) -> Result<String> {
    match rest {
        [id] => Ok(id.clone()),
        [] => bail!("{cmd}: expected an id"),
        _ => bail!("{cmd}: expected exactly one id"),
    }
}
