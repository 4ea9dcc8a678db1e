// Tokenized documents and the corpus that holds them.

/// One paragraph of the corpus as normalized tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    tokens: Vec<String>,
}

impl Document {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of sliding windows of `size` tokens: `len - size + 1`, or zero
    /// when the document is shorter than the window.
    pub fn window_count(&self, size: usize) -> usize {
        if size == 0 || self.tokens.len() < size {
            0
        } else {
            self.tokens.len() - size + 1
        }
    }
}

impl From<Vec<String>> for Document {
    fn from(tokens: Vec<String>) -> Self {
        Self::new(tokens)
    }
}

/// All documents of a corpus, in source paragraph order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }

    pub fn window_count(&self, size: usize) -> usize {
        self.documents.iter().map(|d| d.window_count(size)).sum()
    }
}

impl FromIterator<Document> for Corpus {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
