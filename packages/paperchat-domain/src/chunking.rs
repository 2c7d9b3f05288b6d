/// One window of a chunked document text.
///
/// `start` and `end` are byte offsets into the source text and always fall on
/// character boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
	pub index: i32,
	pub start: usize,
	pub end: usize,
	pub text: String,
}

/// Splits `text` into overlapping character windows.
///
/// Windows hold at most `max_chars` characters and consecutive windows share
/// `overlap_chars` characters. Requires `overlap_chars < max_chars`; config
/// validation guarantees this for configured values.
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
	assert!(overlap_chars < max_chars, "Overlap must be below the window size.");

	let mut chunks = Vec::new();

	if text.is_empty() {
		return chunks;
	}

	// Byte offset of every character boundary, plus the end of the text.
	let boundaries: Vec<usize> =
		text.char_indices().map(|(at, _)| at).chain(std::iter::once(text.len())).collect();
	let total_chars = boundaries.len() - 1;
	let step = max_chars - overlap_chars;
	let mut from = 0;

	while from < total_chars {
		let to = (from + max_chars).min(total_chars);
		let (start, end) = (boundaries[from], boundaries[to]);

		chunks.push(Chunk {
			index: chunks.len() as i32,
			start,
			end,
			text: text[start..end].to_string(),
		});

		if to == total_chars {
			break;
		}

		from += step;
	}

	chunks
}
