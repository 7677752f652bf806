use anyhow::Result;
use clap::Args;

use super::output::{emit, OutputFormat};
use crate::intent::{InstructionParser, KeywordInstructionParser};

#[derive(Args, Clone, Debug)]
pub struct ParseArgs {
    /// Instruction to interpret
    #[arg(required = true, num_args = 1..)]
    pub instruction: Vec<String>,
}

pub fn cmd_parse(args: ParseArgs, output: OutputFormat) -> Result<()> {
    let intent = KeywordInstructionParser::new().parse(&args.instruction.join(" "))?;
    emit(output, &intent, || {
        format!(
            "Recipient: {}\nSubject:   {}\nBody:      {}",
            intent.recipient, intent.subject, intent.body
        )
    })
}
