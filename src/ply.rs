//! # ASCII PLY export
//!
//! Reads and writes colored point clouds in the ASCII flavour of the PLY format, with float
//! `x y z` and `uchar` `red green blue` vertex properties.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use image::Rgb;
use nalgebra::Point3;

use crate::error::*;
use crate::point_cloud::{ColoredPoint, PointCloud};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

const VERTEX_PROPERTIES: [&str; 6] = [
    "property float x",
    "property float y",
    "property float z",
    "property uchar red",
    "property uchar green",
    "property uchar blue"
];

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Write the cloud as ASCII PLY.
pub fn write_ply<W: Write>(writer: &mut W, cloud: &PointCloud) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for prop in VERTEX_PROPERTIES.iter() {
        writeln!(writer, "{}", prop)?;
    }
    writeln!(writer, "end_header")?;

    for point in cloud.iter() {
        let p = point.position;
        let Rgb([r, g, b]) = point.color;
        writeln!(writer, "{:.6} {:.6} {:.6} {} {} {}", p.x, p.y, p.z, r, g, b)?;
    }

    Ok(())
}

/// Write the cloud to a file, replacing any existing one.
pub fn save_ply<P: AsRef<Path>>(path: P, cloud: &PointCloud) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ply(&mut writer, cloud)?;
    writer.flush()?;

    Ok(())
}

/// Parse an ASCII PLY file containing positions and colors.
pub fn read_ply<R: BufRead>(reader: R) -> Result<PointCloud> {
    let mut lines = reader.lines();

    // ---- HEADER ----

    let magic = lines
        .next()
        .ok_or_else(|| Error::Ply("empty file".to_string()))??;
    if magic.trim() != "ply" {
        return Err(Error::Ply(format!("expected 'ply' magic, found '{}'", magic.trim())));
    }

    let mut format = None;
    let mut num_vertices = None;
    let mut properties = Vec::new();

    loop {
        let line = lines
            .next()
            .ok_or_else(|| Error::Ply("unexpected end of file in header".to_string()))??;
        let line = line.trim();

        if line == "end_header" {
            break;
        }
        else if let Some(rest) = line.strip_prefix("format ") {
            format = rest.split_whitespace().next().map(str::to_string);
        }
        else if let Some(rest) = line.strip_prefix("element vertex ") {
            num_vertices = Some(rest.trim().parse::<usize>().map_err(|_| {
                Error::Ply(format!("invalid vertex count '{}'", rest.trim()))
            })?);
        }
        else if line.starts_with("property ") {
            properties.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
        }
    }

    match format.as_deref() {
        Some("ascii") => (),
        Some(other) => {
            return Err(Error::Ply(format!("format '{}' is not supported, only ascii", other)))
        }
        None => return Err(Error::Ply("missing format line".to_string()))
    }

    if properties != VERTEX_PROPERTIES {
        return Err(Error::Ply(format!("unsupported vertex properties {:?}", properties)));
    }

    let num_vertices = num_vertices
        .ok_or_else(|| Error::Ply("missing vertex element".to_string()))?;

    // ---- VERTICES ----

    let mut points = Vec::with_capacity(num_vertices);

    for i in 0..num_vertices {
        let line = lines
            .next()
            .ok_or_else(|| Error::Ply(format!("expected {} vertices, found {}", num_vertices, i)))??;
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() != 6 {
            return Err(Error::Ply(format!(
                "vertex {} has {} values, expected 6", i, fields.len()
            )));
        }

        let mut coords = [0f32; 3];
        for (c, s) in coords.iter_mut().zip(&fields[..3]) {
            *c = s.parse().map_err(|_| Error::Ply(format!("invalid coordinate '{}'", s)))?;
        }

        let mut color = [0u8; 3];
        for (c, s) in color.iter_mut().zip(&fields[3..]) {
            *c = s.parse().map_err(|_| Error::Ply(format!("invalid color '{}'", s)))?;
        }

        points.push(ColoredPoint {
            position: Point3::new(coords[0], coords[1], coords[2]),
            color: Rgb(color)
        });
    }

    Ok(PointCloud::new(points))
}

/// Read a PLY file from disk.
pub fn load_ply<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    read_ply(BufReader::new(File::open(path)?))
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cloud() -> PointCloud {
        PointCloud::new(vec![
            ColoredPoint {
                position: Point3::new(1.5, -0.25, -3.0),
                color: Rgb([255, 0, 12])
            },
            ColoredPoint {
                position: Point3::new(0.1234567, 2.0, -10.5),
                color: Rgb([1, 2, 3])
            }
        ])
    }

    fn to_string(cloud: &PointCloud) -> String {
        let mut buf = Vec::new();
        write_ply(&mut buf, cloud).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn writes_expected_text() {
        let text = to_string(&sample_cloud());

        let expected = "ply\n\
            format ascii 1.0\n\
            element vertex 2\n\
            property float x\n\
            property float y\n\
            property float z\n\
            property uchar red\n\
            property uchar green\n\
            property uchar blue\n\
            end_header\n\
            1.500000 -0.250000 -3.000000 255 0 12\n\
            0.123457 2.000000 -10.500000 1 2 3\n";

        assert_eq!(text, expected);
    }

    #[test]
    fn empty_cloud_writes_header_only() {
        let text = to_string(&PointCloud::default());

        assert!(text.contains("element vertex 0\n"));
        assert!(text.ends_with("end_header\n"));
        assert_eq!(read_ply(text.as_bytes()).unwrap().len(), 0);
    }

    #[test]
    fn reads_back_written_cloud() {
        let cloud = sample_cloud();
        let parsed = read_ply(to_string(&cloud).as_bytes()).unwrap();

        assert_eq!(parsed.len(), cloud.len());
        for (a, b) in parsed.iter().zip(cloud.iter()) {
            assert!((a.position - b.position).norm() < 1e-5);
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn rejects_binary_format() {
        let text = to_string(&sample_cloud())
            .replace("format ascii 1.0", "format binary_little_endian 1.0");

        assert!(matches!(read_ply(text.as_bytes()), Err(Error::Ply(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let text = to_string(&sample_cloud());
        let truncated: String = text.lines().take(11).map(|l| format!("{}\n", l)).collect();

        assert!(matches!(read_ply(truncated.as_bytes()), Err(Error::Ply(_))));
    }

    #[test]
    fn rejects_out_of_range_color() {
        let text = to_string(&sample_cloud()).replace("255 0 12", "256 0 12");

        assert!(matches!(read_ply(text.as_bytes()), Err(Error::Ply(_))));
    }
}
