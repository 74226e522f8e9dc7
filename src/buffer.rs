use std::collections::VecDeque;

/// Ordered IR lines with append at the tail and prepend at the head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmissionBuffer {
  lines: VecDeque<String>,
}

impl EmissionBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, line: impl Into<String>) {
    self.lines.push_back(line.into());
  }

  /// Append an instruction line, indented for a function body.
  pub fn instr(&mut self, text: impl AsRef<str>) {
    self.lines.push_back(format!("  {}", text.as_ref()));
  }

  pub fn prepend(&mut self, line: impl Into<String>) {
    self.lines.push_front(line.into());
  }

  /// Move every line of `other` to the tail of this buffer.
  pub fn splice(&mut self, other: EmissionBuffer) {
    self.lines.extend(other.lines);
  }

  pub fn lines(&self) -> impl Iterator<Item = &str> {
    self.lines.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn into_lines(self) -> Vec<String> {
    self.lines.into()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prepend_places_lines_above_existing_output() {
    let mut buffer = EmissionBuffer::new();
    buffer.append("b");
    buffer.prepend("a");
    buffer.instr("c");
    assert_eq!(buffer.into_lines(), vec!["a", "b", "  c"]);
  }

  #[test]
  fn splice_moves_scratch_lines_to_the_tail() {
    let mut buffer = EmissionBuffer::new();
    buffer.append("first");
    let mut scratch = EmissionBuffer::new();
    scratch.append("second");
    scratch.append("third");
    buffer.splice(scratch);
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.lines().last(), Some("third"));
  }
}
