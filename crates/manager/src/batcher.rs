use crate::store::RequestId;

/// One engine call's worth of inputs.
///
/// `ids` and `texts` are parallel: `texts[k]` is the truncated input of
/// request `ids[k]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Request identities in submission order.
    pub ids: Vec<RequestId>,
    /// Truncated input strings, aligned with `ids`.
    pub texts: Vec<String>,
    /// Sum of the character lengths of `texts`.
    pub total_chars: usize,
}

impl Batch {
    /// Number of inputs in the batch.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch holds no inputs.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(&mut self, id: RequestId, text: String, chars: usize) {
        self.ids.push(id);
        self.texts.push(text);
        self.total_chars += chars;
    }
}

/// Cut `text` down to at most `max_chars` characters.
///
/// Returns the character count of the result. The remainder is dropped.
fn truncate_chars(text: &mut String, max_chars: usize) -> usize {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            text.truncate(byte_idx);
            max_chars
        }
        None => text.chars().count(),
    }
}

/// Partition `items` into batches whose character totals fit
/// `max_batch_size`.
///
/// Single greedy pass: each item is truncated to the budget, then appended to
/// the current batch unless that would push the total over the budget, in
/// which case the current batch is closed and the item starts a new one.
/// Concatenating the returned batches reproduces the input order.
///
/// # Examples
///
/// ```
/// use vecbatch_manager::split;
///
/// let items = (0..5).map(|id| (id, "abcd".to_owned()));
/// let batches = split(items, 8);
/// let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
pub fn split<I>(items: I, max_batch_size: usize) -> Vec<Batch>
where
    I: IntoIterator<Item = (RequestId, String)>,
{
    let mut batches = Vec::new();
    let mut current = Batch::default();

    for (id, mut text) in items {
        let chars = truncate_chars(&mut text, max_batch_size);
        if !current.is_empty() && current.total_chars + chars > max_batch_size {
            batches.push(std::mem::take(&mut current));
        }
        current.push(id, text, chars);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
