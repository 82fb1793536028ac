//! OBJ file loader for 3D models

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::render::primitives::{Mesh, Vertex};

/// OBJ parsing errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// Underlying read failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A number or index did not parse
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Wavefront OBJ loader (positions, normals, UVs, polygon faces)
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and return a mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text from any reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_index + 1;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => positions.push(parse_floats::<3>(parts, line_no)?),
                Some("vn") => normals.push(parse_floats::<3>(parts, line_no)?),
                Some("vt") => {
                    let [u, v] = parse_floats::<2>(parts, line_no)?;
                    // OBJ puts v=0 at the bottom of the image; textures are stored top row first.
                    tex_coords.push([u, 1.0 - v]);
                }
                Some("f") => {
                    let mut face = Vec::new();
                    for corner in parts {
                        let vertex = resolve_corner(corner, line_no, &positions, &tex_coords, &normals)?;
                        vertices.push(vertex);
                        face.push(vertices.len() as u32 - 1);
                    }
                    if face.len() < 3 {
                        return Err(ObjError::Parse {
                            line: line_no,
                            message: "face needs at least three corners".to_string(),
                        });
                    }
                    // Fan triangulation
                    for i in 1..face.len() - 1 {
                        indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if vertices.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ file".to_string()));
        }

        Ok(Mesh::new(vertices, indices))
    }
}

fn parse_floats<'a, const N: usize>(
    mut parts: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for slot in &mut out {
        let token = parts.next().ok_or_else(|| ObjError::Parse {
            line,
            message: format!("expected {N} components"),
        })?;
        *slot = token.parse().map_err(|_| ObjError::Parse {
            line,
            message: format!("invalid number '{token}'"),
        })?;
    }
    Ok(out)
}

fn parse_index(token: &str, line: usize, len: usize) -> Result<Option<usize>, ObjError> {
    if token.is_empty() {
        return Ok(None);
    }
    let raw: i64 = token.parse().map_err(|_| ObjError::Parse {
        line,
        message: format!("invalid index '{token}'"),
    })?;
    // 1-based, negative values count back from the end.
    let index = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if index < 0 || index as usize >= len {
        return Err(ObjError::InvalidFormat(format!("index {raw} out of bounds on line {line}")));
    }
    Ok(Some(index as usize))
}

fn resolve_corner(
    corner: &str,
    line: usize,
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    normals: &[[f32; 3]],
) -> Result<Vertex, ObjError> {
    let mut fields = corner.split('/');
    let position = parse_index(fields.next().unwrap_or(""), line, positions.len())?
        .map(|i| positions[i])
        .ok_or_else(|| ObjError::Parse {
            line,
            message: "face corner without position".to_string(),
        })?;
    let tex_coord = parse_index(fields.next().unwrap_or(""), line, tex_coords.len())?
        .map_or([0.0, 0.0], |i| tex_coords[i]);
    let normal = parse_index(fields.next().unwrap_or(""), line, normals.len())?
        .map_or([0.0, 1.0, 0.0], |i| normals[i]);

    Ok(Vertex {
        position,
        normal,
        tex_coord,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 1
vn 0 0 1
f 1/1/1 2/1/1 3/2/1 4/2/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjLoader::parse(Cursor::new(QUAD)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[2].normal, [0.0, 0.0, 1.0]);
        // v is flipped to top-row-first
        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(mesh.vertices[2].tex_coord, [1.0, 0.0]);
    }

    #[test]
    fn test_negative_indices() {
        let mesh = ObjLoader::parse(Cursor::new("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n")).unwrap();
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_out_of_bounds_index() {
        let result = ObjLoader::parse(Cursor::new("v 0 0 0\nf 1 2 3\n"));
        assert!(matches!(result, Err(ObjError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_file() {
        assert!(ObjLoader::parse(Cursor::new("# nothing\n")).is_err());
    }
}
