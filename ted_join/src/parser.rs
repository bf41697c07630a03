//! Reads tree collections written in bracket notation, one tree per line.
//!
//! `{a{b}{c{d}}}` is a root `a` with children `b` and `c`, and `c` has a child `d`. Inside a label,
//! `\{`, `\}` and `\\` stand for the literal characters.

use crate::error::Error;
use crate::node::Node;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

// Returns an Iterator to the Reader of the lines of the file.
fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where P: AsRef<Path>, {
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}

pub struct BracketNotationParser {}

impl BracketNotationParser {

    /// Parses every non-empty line of `filename`. Line order defines the tree identifiers.
    pub fn parse_collection<P: AsRef<Path>>(filename: P) -> Result<Vec<Node<String>>, Error> {

        let mut trees: Vec<Node<String>> = Vec::new();

        for (i, line) in read_lines(filename)?.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            trees.push(Self::parse_single(&line, i + 1)?);
        }

        return Ok(trees);
    }

    pub fn parse_collection_str(contents: &str) -> Result<Vec<Node<String>>, Error> {

        let mut trees: Vec<Node<String>> = Vec::new();

        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            trees.push(Self::parse_single(line, i + 1)?);
        }

        return Ok(trees);
    }

    /// Parses one tree. `line_number` only feeds error messages.
    pub fn parse_single(line: &str, line_number: usize) -> Result<Node<String>, Error> {

        //ancestors of the node whose children are being read
        let mut stack: Vec<Node<String>> = Vec::new();
        let mut label = String::new();
        let mut in_label = false;
        let mut finished: Option<Node<String>> = None;

        let mut chars = line.trim().chars();

        while let Some(c) = chars.next() {

            if finished.is_some() {
                return Err(Error::parse(line_number, "trailing characters after the root closed"));
            }

            match (c, in_label) {
                ('\\', true) => {
                    match chars.next() {
                        Some(escaped) => label.push(escaped),
                        None => return Err(Error::parse(line_number, "dangling escape at end of line")),
                    }
                },
                ('{', true) => {
                    stack.push(Node::new(std::mem::take(&mut label)));
                },
                ('{', false) => {
                    in_label = true;
                },
                ('}', true) => {
                    let leaf = Node::new(std::mem::take(&mut label));
                    in_label = false;
                    match stack.last_mut() {
                        Some(parent) => parent.add_child(leaf),
                        None => finished = Some(leaf),
                    }
                },
                ('}', false) => {
                    let node = match stack.pop() {
                        Some(node) => node,
                        None => return Err(Error::parse(line_number, "unbalanced closing brace")),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.add_child(node),
                        None => finished = Some(node),
                    }
                },
                (_, true) => label.push(c),
                (_, false) => {
                    return Err(Error::parse(line_number, "unexpected character outside of a node"));
                },
            }
        }

        match finished {
            Some(root) => Ok(root),
            None => Err(Error::parse(line_number, "unbalanced braces")),
        }
    }
}
