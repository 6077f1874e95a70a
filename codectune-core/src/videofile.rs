//! Video file identity.
//!
//! The tuning core never opens video files; it only needs a stable identity
//! (basename) plus the dimensions and framerate encoded in the conventional
//! test-clip filenames, e.g. `foo_640x480_30.yuv` or `foo_640_480_30.yuv`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

static DIMENSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d+)x(\d+)_(\d+)").expect("static pattern"));
static UNDERSCORE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d+)_(\d+)_(\d+)$").expect("static pattern"));

/// Identity of one video clip: its filename plus the width, height and
/// framerate parsed from it.
///
/// The cache stores results under the clip's basename, so two `Videofile`s
/// with the same basename refer to the same cache entries; equality follows
/// the basename.
#[derive(Debug, Clone)]
pub struct Videofile {
    filename: String,
    basename: String,
    width: u32,
    height: u32,
    framerate: u32,
}

impl Videofile {
    /// Parses the filename to find width, height and framerate.
    pub fn new(filename: &str) -> CoreResult<Self> {
        let basename = Path::new(filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| CoreError::InvalidVideoFilename(filename.to_string()))?
            .to_string();
        let captures = DIMENSION_PATTERN
            .captures(&basename)
            .or_else(|| UNDERSCORE_PATTERN.captures(&basename))
            .ok_or_else(|| CoreError::InvalidVideoFilename(filename.to_string()))?;

        // The patterns only admit digits, but very long digit runs can
        // still overflow, and a zero field would make the frame size or
        // bitrate arithmetic meaningless.
        let field = |index: usize| -> CoreResult<u32> {
            match captures[index].parse() {
                Ok(value) if value > 0 => Ok(value),
                _ => Err(CoreError::InvalidVideoFilename(filename.to_string())),
            }
        };
        let width = field(1)?;
        let height = field(2)?;
        let framerate = field(3)?;
        Ok(Self {
            filename: filename.to_string(),
            basename,
            width,
            height,
            framerate,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Filename without directory and extension; the cache identity.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }

    /// Bitrate of an encoded rendition of this clip, in kilobits per second,
    /// given the encoded size in bytes. Reads the source file's size to count
    /// frames; YUV 4:2:0 is 12 bits per pixel.
    pub fn measured_bitrate(&self, encoded_size: u64) -> CoreResult<u32> {
        let frame_size = u64::from(self.width) * u64::from(self.height) * 3 / 2;
        let source_size = std::fs::metadata(&self.filename)?.len();
        let frame_count = source_size / frame_size;
        if frame_count == 0 {
            return Err(CoreError::Precondition(format!(
                "source file {} holds no complete frame",
                self.filename
            )));
        }
        let encoded_frame_size = encoded_size / frame_count;
        Ok((encoded_frame_size * u64::from(self.framerate) * 8 / 1000) as u32)
    }
}

impl PartialEq for Videofile {
    fn eq(&self, other: &Self) -> bool {
        self.basename == other.basename
    }
}

impl Eq for Videofile {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_filename() {
        let video = Videofile::new("clips/Kimono1_1920x1080_24.yuv").unwrap();
        assert_eq!(video.basename(), "Kimono1_1920x1080_24");
        assert_eq!(video.width(), 1920);
        assert_eq!(video.height(), 1080);
        assert_eq!(video.framerate(), 24);
    }

    #[test]
    fn test_underscore_filename() {
        let video = Videofile::new("foofile_640_480_30.yuv").unwrap();
        assert_eq!(video.width(), 640);
        assert_eq!(video.height(), 480);
        assert_eq!(video.framerate(), 30);
        assert_eq!(video.basename(), "foofile_640_480_30");
    }

    #[test]
    fn test_unparsable_filename() {
        assert!(matches!(
            Videofile::new("plainfile.yuv"),
            Err(CoreError::InvalidVideoFilename(_))
        ));
    }

    #[test]
    fn test_zero_dimension_filename_rejected() {
        assert!(matches!(
            Videofile::new("clip_0x0_30.yuv"),
            Err(CoreError::InvalidVideoFilename(_))
        ));
        assert!(matches!(
            Videofile::new("clip_640_480_0.yuv"),
            Err(CoreError::InvalidVideoFilename(_))
        ));
    }

    #[test]
    fn test_measured_bitrate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_4x2_10.yuv");
        // Frame size is 4 * 2 * 3 / 2 = 12 bytes; ten frames.
        std::fs::write(&path, vec![0u8; 120]).unwrap();
        let video = Videofile::new(path.to_str().unwrap()).unwrap();
        // 125000 bytes over 10 frames at 10 fps is 1000 kbps.
        assert_eq!(video.measured_bitrate(125_000).unwrap(), 1000);
    }

    #[test]
    fn test_measured_bitrate_needs_a_full_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_640x480_30.yuv");
        std::fs::write(&path, b"short").unwrap();
        let video = Videofile::new(path.to_str().unwrap()).unwrap();
        assert!(matches!(
            video.measured_bitrate(1000),
            Err(CoreError::Precondition(_))
        ));
    }

    #[test]
    fn test_equality_by_basename() {
        let one = Videofile::new("a/foofile_640_480_30.yuv").unwrap();
        let other = Videofile::new("b/foofile_640_480_30.yuv").unwrap();
        assert_eq!(one, other);
        assert_ne!(one, Videofile::new("barfile_640_480_30.yuv").unwrap());
    }
}
