//! Saving and loading trained networks as JSON
//!
//! A saved network is a JSON document with a small header in front of the network itself:
//!
//! ```json
//! { "format": "aln", "version": 1, "network": { ... } }
//! ```
//!
//! Loading checks the header and the structure of the network before handing it out.
use std::io::{Read, Write};

use serde_crate::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AlnError, Result};
use crate::model::Aln;

const FORMAT: &str = "aln";
const VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(crate = "serde_crate")]
struct Document<'a> {
    format: &'a str,
    version: u32,
    network: &'a Aln,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct OwnedDocument {
    format: String,
    version: u32,
    network: Aln,
}

impl Aln {
    /// Writes the network as JSON into `writer`
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.document())?;
        debug!(nodes = self.nodes.len(), "saved network");
        Ok(())
    }

    /// Reads a network written by [`Aln::save`]
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let document: OwnedDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    /// Serializes the network into a JSON string
    ///
    /// ```rust
    /// use linfa_aln::Aln;
    ///
    /// let aln = Aln::new(3, 2).unwrap();
    /// let restored = Aln::from_json(&aln.to_json().unwrap()).unwrap();
    /// assert_eq!(aln, restored);
    /// ```
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.document())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: OwnedDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn document(&self) -> Document<'_> {
        Document {
            format: FORMAT,
            version: VERSION,
            network: self,
        }
    }

    fn from_document(document: OwnedDocument) -> Result<Self> {
        if document.format != FORMAT {
            return Err(AlnError::MalformedModel(format!(
                "expected format {:?}, found {:?}",
                FORMAT, document.format
            )));
        }
        if document.version != VERSION {
            return Err(AlnError::MalformedModel(format!(
                "unsupported version {}",
                document.version
            )));
        }

        let mut aln = document.network;
        aln.region.refresh();
        aln.validate()?;
        debug!(nodes = aln.nodes.len(), "loaded network");
        Ok(aln)
    }
}
