use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{fs, io};

use regex::Regex;

use crate::error::{Result, SpellError};
use crate::model::vocabulary::Vocabulary;

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Token standing for the space between two words in character sequences.
pub const SPACE_TOKEN: &str = "<sp>";

/// Splits raw text into lowercase word tokens.
///
/// - URLs, digits and punctuation are dropped
/// - Apostrophes are removed inside words (`don't` → `dont`)
/// - A token is a maximal run of letters
pub struct Tokenizer {
	url: Regex,
	apostrophe: Regex,
	word: Regex,
}

impl Tokenizer {
	pub fn new() -> Result<Self> {
		Ok(Self {
			url: Regex::new(r"https?://\S+")?,
			apostrophe: Regex::new(r"['’]")?,
			word: Regex::new(r"\p{L}+")?,
		})
	}

	pub fn tokenize(&self, text: &str) -> Vec<String> {
		let text = text.to_lowercase();
		let text = self.url.replace_all(&text, " ");
		let text = self.apostrophe.replace_all(&text, "");
		self.word.find_iter(&text).map(|token| token.as_str().to_owned()).collect()
	}

	/// One token per character of the words of `text`, with `SPACE_TOKEN`
	/// between consecutive words.
	pub fn tokenize_chars(&self, text: &str) -> Vec<String> {
		let mut tokens = Vec::new();
		for word in self.tokenize(text) {
			if !tokens.is_empty() {
				tokens.push(SPACE_TOKEN.to_owned());
			}
			tokens.extend(word.chars().map(String::from));
		}
		tokens
	}
}

/// Turns character tokens back into text, see `Tokenizer::tokenize_chars`.
pub fn join_chars<S: AsRef<str>>(tokens: &[S]) -> String {
	tokens
		.iter()
		.map(|token| match token.as_ref() {
			SPACE_TOKEN => " ",
			token => token,
		})
		.collect()
}

/// Tokenizes a single piece of text, see `Tokenizer`.
pub fn tokenize(text: &str) -> Result<Vec<String>> {
	Ok(Tokenizer::new()?.tokenize(text))
}

/// Reads a corpus file, one sentence per line.
///
/// Lines without any word are skipped.
pub fn read_corpus<P: AsRef<Path>>(filename: P) -> Result<Vec<Vec<String>>> {
	let tokenizer = Tokenizer::new()?;
	Ok(read_file(filename)?
		.iter()
		.map(|line| tokenizer.tokenize(line))
		.filter(|sentence| !sentence.is_empty())
		.collect())
}

/// Reads a vocabulary file of `word count` lines.
///
/// Blank lines are skipped, words are lowercased and repeated words summed.
///
/// # Errors
/// Returns `InvalidInput` for a malformed line or an empty vocabulary.
pub fn read_vocabulary<P: AsRef<Path>>(filename: P) -> Result<Vocabulary> {
	let mut counts: HashMap<String, u64> = HashMap::new();
	for (number, line) in read_file(filename)?.iter().enumerate() {
		let fields: Vec<&str> = line.split_whitespace().collect();
		match fields.as_slice() {
			[] => continue,
			[word, count] => {
				let count: u64 = count.parse().map_err(|_| {
					SpellError::invalid_input(format!("line {}: invalid count {count:?}", number + 1))
				})?;
				*counts.entry(word.to_lowercase()).or_insert(0) += count;
			}
			_ => return Err(SpellError::invalid_input(format!("line {}: expected `word count`", number + 1))),
		}
	}
	Vocabulary::new(counts)
}

/// Reads `misspelling<TAB>correction` lines into pairs.
///
/// Blank lines are skipped and both words are lowercased.
///
/// # Errors
/// Returns `InvalidInput` for a line that is not exactly two words.
pub fn read_error_pairs<P: AsRef<Path>>(filename: P) -> Result<Vec<(String, String)>> {
	let mut pairs = Vec::new();
	for (number, line) in read_file(filename)?.iter().enumerate() {
		let fields: Vec<&str> = line.split_whitespace().collect();
		match fields.as_slice() {
			[] => continue,
			[misspelling, correction] => pairs.push((misspelling.to_lowercase(), correction.to_lowercase())),
			_ => {
				return Err(SpellError::invalid_input(format!(
					"line {}: expected `misspelling<TAB>correction`",
					number + 1
				)));
			}
		}
	}
	Ok(pairs)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/input.dat` + `"bin"` → `data/input.bin`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/english.dat"` → `"english"`
/// - `"english.dat"` → `"english"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}
