//! Reader for the generator's v2.2 ASCII mesh format.
//!
//! Node identifiers are 1-based on disk and converted to 0-based. The
//! element tag kept as the element ID is the second one (the physical-group
//! tag under the generator's convention). Pyramid connectivity is permuted
//! on the fly (`node_list[2]` and `node_list[3]` swapped) to match the
//! internal face numbering. Format versions 4.0 and 4.1 are recognised but
//! not supported.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;

use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::mesh::{ElementBlock, Mesh};

pub fn read(path: &Path) -> Result<Mesh> {
    let file = File::open(path)?;
    parse(BufReader::new(file))
}

pub fn parse<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut lines = Lines::new(reader);

    lines.expect("$MeshFormat")?;
    let header = lines.next_line()?;
    let version: f64 = parse_token(header.split_whitespace().next().unwrap_or(""), "version")?;
    if (version - 2.2).abs() < 1e-6 {
        parse_v22(&mut lines)
    } else if (version - 4.0).abs() < 1e-6 || (version - 4.1).abs() < 1e-6 {
        Err(Error::InvalidInput(format!(
            "mesh format version {version} is recognised but not supported"
        )))
    } else {
        Err(Error::InvalidInput(format!(
            "unknown mesh format version: {version}"
        )))
    }
}

fn parse_v22<R: BufRead>(lines: &mut Lines<R>) -> Result<Mesh> {
    lines.expect("$EndMeshFormat")?;
    lines.expect("$Nodes")?;
    let num_nodes: usize = parse_token(&lines.next_line()?, "node count")?;

    let mut coordinates = Vec::with_capacity(num_nodes * 3);
    for _ in 0..num_nodes {
        let line = lines.next_line()?;
        let mut tokens = line.split_whitespace();
        let _id: usize = parse_token(tokens.next().unwrap_or(""), "node id")?;
        for axis in ["x", "y", "z"] {
            coordinates.push(parse_token(tokens.next().unwrap_or(""), axis)?);
        }
    }
    lines.expect("$EndNodes")?;

    lines.expect("$Elements")?;
    let num_elements: usize = parse_token(&lines.next_line()?, "element count")?;

    let mut blocks: BTreeMap<ElementType, ElementBlock> = BTreeMap::new();
    for _ in 0..num_elements {
        let line = lines.next_line()?;
        let mut tokens = line.split_whitespace();
        let _id: usize = parse_token(tokens.next().unwrap_or(""), "element id")?;
        let code: usize = parse_token(tokens.next().unwrap_or(""), "element type")?;
        let ty = ElementType::from_gmsh_code(code).ok_or_else(|| {
            Error::InvalidInput(format!("unknown element type code {code} on line: {line}"))
        })?;

        let num_tags: usize = parse_token(tokens.next().unwrap_or(""), "tag count")?;
        let mut tags = Vec::with_capacity(num_tags);
        for _ in 0..num_tags {
            tags.push(parse_token::<usize>(tokens.next().unwrap_or(""), "tag")?);
        }
        let id = tags.get(1).copied().unwrap_or(0);

        let mut node_list = Vec::with_capacity(ty.num_vertices());
        for _ in 0..ty.num_vertices() {
            let node: usize = parse_token(tokens.next().unwrap_or(""), "node reference")?;
            let node = node.checked_sub(1).ok_or_else(|| {
                Error::InvalidInput(format!("node references are 1-based, got 0 in: {line}"))
            })?;
            if node >= num_nodes {
                return Err(Error::InvalidInput(format!(
                    "element references node {} but the mesh has {num_nodes} nodes",
                    node + 1
                )));
            }
            node_list.push(node);
        }
        if ty == ElementType::Pyramid {
            node_list.swap(2, 3);
        }

        let (csr, ids) = blocks.entry(ty).or_default();
        csr.push_back(&node_list);
        ids.push(id);
    }

    // Point elements are discarded; the vertex block is synthesised by the
    // container for every node.
    blocks.remove(&ElementType::Vertex);
    let dim = blocks
        .keys()
        .map(|ty| ty.topologic_dim())
        .max()
        .unwrap_or(0);
    if dim == 0 {
        return Err(Error::InvalidInput(
            "mesh declares no elements above dimension 0".into(),
        ));
    }

    // The file always carries three coordinates; keep the first `dim`.
    let mut nodes = Vec::with_capacity(num_nodes * dim);
    for node in coordinates.chunks_exact(3) {
        nodes.extend_from_slice(&node[..dim]);
    }
    let nodes = Array2::from_shape_vec((num_nodes, dim), nodes)
        .map_err(|e| Error::InvalidInput(format!("malformed coordinate table: {e}")))?;

    Mesh::assemble(dim, nodes, &blocks)
}

struct Lines<R> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<String> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_line(&mut self.buffer)?;
            if read == 0 {
                return Err(Error::InvalidInput(format!(
                    "unexpected end of file after line {}",
                    self.line_number
                )));
            }
            self.line_number += 1;
            let line = self.buffer.trim();
            if !line.is_empty() {
                return Ok(line.to_owned());
            }
        }
    }

    fn expect(&mut self, keyword: &str) -> Result<()> {
        let line = self.next_line()?;
        if line == keyword {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "expected `{keyword}` on line {}, found `{line}`",
                self.line_number
            )))
        }
    }
}

fn parse_token<T: FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::InvalidInput(format!("cannot parse {what} from `{token}`")))
}
