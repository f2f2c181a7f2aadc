use crate::command::Command;
use crate::utils::Result;

/// Lazy stream of rendered prompts
pub type Renders<'s> = Box<dyn Iterator<Item = Result<String>> + 's>;

/// How a generation mode turns a command tree into text.
///
/// The parser builds one tree regardless of mode; each mode supplies its own
/// evaluation of the same node shapes. `depth` counts how many wildcard values
/// have been re-parsed on the way to `command`.
pub trait RenderStrategy {
    fn render<'s>(&'s mut self, command: &'s Command, depth: usize) -> Renders<'s>;

    /// The first rendering of `command`, or the empty prompt when there is none
    fn render_one(&mut self, command: &Command) -> Result<String> {
        self.render(command, 0)
            .next()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
