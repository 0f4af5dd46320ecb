use crate::utils::info::ApngInfo;
use std::fmt::{Display, Formatter};

fn print_row(f: &mut Formatter<'_>, values: &[String], widths: &[usize]) -> std::fmt::Result {
    for (i, (value, width)) in values.iter().zip(widths).enumerate() {
        if i == 0 {
            write!(f, "  {:>width$}", value, width = width)?;
        } else {
            write!(f, " {:>width$}", value, width = width)?;
        }
    }

    writeln!(f)
}

impl Display for ApngInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dimensions: {}x{}", self.width, self.height)?;
        writeln!(f, "Color type: {:?}, {} bit", self.color_type, self.bit_depth)?;
        writeln!(f, "Interlaced: {}", self.interlaced)?;
        writeln!(f, "Transparency: {}", self.has_transparency)?;
        writeln!(f, "Animated: {}", self.animated)?;

        if !self.animated {
            writeln!(f, "Duration: {:.1} ms (fallback)", self.total_duration_ms)?;
            return Ok(());
        }

        match self.declared_frame_count {
            Some(declared) if declared as usize != self.frame_count => {
                writeln!(f, "Frames: {} ({} declared)", self.frame_count, declared)?;
            }
            _ => writeln!(f, "Frames: {}", self.frame_count)?,
        }

        if self.play_count == 0 {
            writeln!(f, "Plays: infinite")?;
        } else {
            writeln!(f, "Plays: {}", self.play_count)?;
        }

        writeln!(f, "Default image is frame 0: {}", self.default_image_is_frame)?;
        writeln!(f, "Duration: {:.1} ms", self.total_duration_ms)?;

        writeln!(f, "====================")?;

        let header: Vec<String> = ["seq", "size", "offset", "delay", "dispose", "blend"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows: Vec<Vec<String>> = self
            .frames
            .iter()
            .map(|frame| {
                vec![
                    frame.sequence_number.to_string(),
                    format!("{}x{}", frame.width, frame.height),
                    format!("{},{}", frame.x_offset, frame.y_offset),
                    format!("{:.1}ms", frame.delay_ms()),
                    format!("{:?}", frame.dispose_op),
                    format!("{:?}", frame.blend_op),
                ]
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|column| {
                rows.iter()
                    .map(|row| row[column].len())
                    .chain(std::iter::once(header[column].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        print_row(f, &header, &widths)?;
        for row in &rows {
            print_row(f, row, &widths)?;
        }

        Ok(())
    }
}
