use std::path::Path;
use std::str::FromStr;

use log::{debug, trace};

use crate::error::{ParseError, ParseResult, END_OF_INPUT};
use crate::tokens::{found, tokenize, Keyword, TokenCursor};
use crate::types::*;
use crate::utils;

/// Knobs for [`parse_bvh_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept more than one `ROOT` tree. Strict BVH allows one; many exporters write several.
    pub allow_multiple_roots: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            allow_multiple_roots: true,
        }
    }
}

/// Frame count and frame interval declared by the MOTION header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionHeader {
    pub num_frames: usize,
    pub frame_time: f64,
}

/////////////////////////////////////////// HIERARCHY ///////////////////////////////////////////

fn expect_keyword(cursor: &mut TokenCursor, keyword: Keyword) -> ParseResult<()> {
    let position = cursor.position();
    match cursor.next_token() {
        Some((_, token)) if Keyword::classify(token) == keyword => Ok(()),
        other => Err(ParseError::MalformedBlock {
            expected: keyword.literal(),
            found: found(other.map(|(_, token)| token)),
            position,
        }),
    }
}

fn block_number<T: FromStr>(cursor: &mut TokenCursor, expected: &'static str) -> ParseResult<T> {
    let position = cursor.position();
    match cursor.next_number::<T>() {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(ParseError::MalformedBlock {
            expected,
            found: END_OF_INPUT.to_string(),
            position,
        }),
        Err((position, token)) => Err(ParseError::NumericFormat {
            expected,
            token: token.to_string(),
            position,
        }),
    }
}

/// Next token as a name or channel tag. Any token but a brace is taken verbatim.
fn block_word<'a>(cursor: &mut TokenCursor<'_, 'a>, expected: &'static str) -> ParseResult<&'a str> {
    let position = cursor.position();
    match cursor.next_token() {
        Some((_, token))
            if !matches!(Keyword::classify(token), Keyword::OpenBrace | Keyword::CloseBrace) =>
        {
            Ok(token)
        }
        other => Err(ParseError::MalformedBlock {
            expected,
            found: found(other.map(|(_, token)| token)),
            position,
        }),
    }
}

fn read_offset(cursor: &mut TokenCursor) -> ParseResult<Position> {
    expect_keyword(cursor, Keyword::Offset)?;
    let x = block_number(cursor, "offset value")?;
    let y = block_number(cursor, "offset value")?;
    let z = block_number(cursor, "offset value")?;
    Ok(Position::new(x, y, z))
}

/// Decode `<name> { OFFSET x y z [CHANNELS n c1 .. cn]` right after a `ROOT` or `JOINT` keyword.
/// The block stays open; the caller closes it on the matching `}`.
fn read_joint(
    cursor: &mut TokenCursor,
    skeleton: &mut Skeleton,
    parent: Option<Index>,
) -> ParseResult<Index> {
    let name = block_word(cursor, "joint name")?.to_string();
    expect_keyword(cursor, Keyword::OpenBrace)?;
    let offset = read_offset(cursor)?;

    let mut channels = Vec::new();
    if cursor.peek_keyword() == Some(Keyword::Channels) {
        cursor.next_token();
        let count: usize = block_number(cursor, "channel count")?;
        for _ in 0..count {
            channels.push(Channel::from_name(block_word(cursor, "channel name")?));
        }
    }

    trace!("joint `{}` with {} channel(s)", name, channels.len());
    Ok(skeleton.push_joint(name, offset, channels, parent))
}

/// Decode `Site { OFFSET x y z }` right after an `End` keyword. The leaf closes itself.
fn read_end_site(cursor: &mut TokenCursor, skeleton: &mut Skeleton, parent: Index) -> ParseResult<Index> {
    expect_keyword(cursor, Keyword::Site)?;
    expect_keyword(cursor, Keyword::OpenBrace)?;
    let offset = read_offset(cursor)?;
    expect_keyword(cursor, Keyword::CloseBrace)?;
    Ok(skeleton.push_joint(END_SITE_NAME.to_string(), offset, Vec::new(), Some(parent)))
}

/// Parse the HIERARCHY section with default options.
///
/// Returns the joint forest and the index of the first token after it (normally `MOTION`).
pub fn parse_hierarchy(tokens: &[&str]) -> ParseResult<(Skeleton, usize)> {
    parse_hierarchy_with(tokens, &ParseOptions::default())
}

pub fn parse_hierarchy_with(tokens: &[&str], options: &ParseOptions) -> ParseResult<(Skeleton, usize)> {
    let mut cursor = TokenCursor::new(tokens, 0);
    match cursor.next_token() {
        Some((_, token)) if Keyword::classify(token) == Keyword::Hierarchy => {}
        other => {
            return Err(ParseError::MalformedHeader {
                expected: Keyword::Hierarchy.literal(),
                found: found(other.map(|(_, token)| token)),
                position: 0,
            })
        }
    }

    let mut skeleton = Skeleton::default();
    //// joints whose `{` has been read but not their `}`
    let mut open_blocks: Vec<Index> = Vec::new();

    while cursor.peek_keyword() == Some(Keyword::Root) {
        if !options.allow_multiple_roots && !skeleton.roots.is_empty() {
            break;
        }
        cursor.next_token();
        let root = read_joint(&mut cursor, &mut skeleton, None)?;
        open_blocks.push(root);

        while let Some(&current) = open_blocks.last() {
            let Some((position, token)) = cursor.next_token() else {
                return Err(ParseError::MalformedBlock {
                    expected: Keyword::CloseBrace.literal(),
                    found: END_OF_INPUT.to_string(),
                    position: cursor.position(),
                });
            };
            match Keyword::classify(token) {
                Keyword::Joint => {
                    let joint = read_joint(&mut cursor, &mut skeleton, Some(current))?;
                    open_blocks.push(joint);
                }
                Keyword::End => {
                    read_end_site(&mut cursor, &mut skeleton, current)?;
                }
                Keyword::CloseBrace => {
                    open_blocks.pop();
                }
                Keyword::Hierarchy
                | Keyword::Root
                | Keyword::Site
                | Keyword::OpenBrace
                | Keyword::Offset
                | Keyword::Channels
                | Keyword::Motion
                | Keyword::Frames
                | Keyword::Frame
                | Keyword::Time
                | Keyword::Other => {
                    return Err(ParseError::UnexpectedToken {
                        token: token.to_string(),
                        position,
                    })
                }
            }
        }
    }

    debug!(
        "parsed hierarchy: {} root(s), {} joint(s), {} channel(s) per frame",
        skeleton.roots.len(),
        skeleton.len(),
        skeleton.channel_count()
    );
    Ok((skeleton, cursor.position()))
}

//////////////////////////////////////////// MOTION /////////////////////////////////////////////

fn expect_motion_keyword(cursor: &mut TokenCursor, keyword: Keyword) -> ParseResult<()> {
    let position = cursor.position();
    match cursor.next_token() {
        Some((_, token)) if Keyword::classify(token) == keyword => Ok(()),
        other => Err(ParseError::MalformedMotionHeader {
            expected: keyword.literal(),
            found: found(other.map(|(_, token)| token)),
            position,
        }),
    }
}

fn motion_number<T: FromStr>(cursor: &mut TokenCursor, expected: &'static str) -> ParseResult<T> {
    let position = cursor.position();
    match cursor.next_number::<T>() {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(ParseError::MalformedMotionHeader {
            expected,
            found: END_OF_INPUT.to_string(),
            position,
        }),
        Err((position, token)) => Err(ParseError::NumericFormat {
            expected,
            token: token.to_string(),
            position,
        }),
    }
}

fn read_motion_header(cursor: &mut TokenCursor) -> ParseResult<MotionHeader> {
    let position = cursor.position();
    match cursor.next_token() {
        Some((_, token)) if Keyword::classify(token) == Keyword::Motion => {}
        other => {
            return Err(ParseError::MalformedHeader {
                expected: Keyword::Motion.literal(),
                found: found(other.map(|(_, token)| token)),
                position,
            })
        }
    }

    expect_motion_keyword(cursor, Keyword::Frames)?;
    let num_frames = motion_number::<usize>(cursor, "frame count")?;
    //// `Frame Time:` is two tokens and both have to match
    expect_motion_keyword(cursor, Keyword::Frame)?;
    expect_motion_keyword(cursor, Keyword::Time)?;
    let frame_time = motion_number::<f64>(cursor, "frame time")?;

    debug!("motion: {} frame(s), {}s per frame", num_frames, frame_time);
    Ok(MotionHeader {
        num_frames,
        frame_time,
    })
}

/// Decode the MOTION section starting at `cursor`, appending one [`Frame`] per declared frame
/// to every joint that has channels.
///
/// Values are sliced onto joints in the same pre-order the hierarchy was declared in; End
/// Sites consume nothing. Every token up to the end must be used, and a frame count the
/// remaining tokens can't cover fails with [`ParseError::TruncatedData`] up front. On error
/// the skeleton may hold some decoded frames and should be discarded.
pub fn decode_motion(
    tokens: &[&str],
    cursor: usize,
    skeleton: &mut Skeleton,
) -> ParseResult<(MotionHeader, usize)> {
    let mut cursor = TokenCursor::new(tokens, cursor);
    let header = read_motion_header(&mut cursor)?;

    //// the traversal is identical for every frame, so compute it once
    let order = utils::channel_order(skeleton);

    //// a frame count the remaining tokens can't fill fails before anything is decoded
    let per_frame = skeleton.channel_count();
    let available = cursor.remaining();
    let fits = header
        .num_frames
        .checked_mul(per_frame)
        .map_or(false, |needed| needed <= available);
    if !fits {
        let mut left = available % per_frame;
        let joint = order
            .iter()
            .map(|&index| &skeleton.joints[index])
            .find(|joint| {
                if joint.channels.len() > left {
                    true
                } else {
                    left -= joint.channels.len();
                    false
                }
            })
            .map(|joint| joint.name.clone())
            .unwrap_or_default();
        return Err(ParseError::TruncatedData {
            frame: available / per_frame,
            joint,
            position: cursor.position() + available,
        });
    }

    //// End Sites only: every frame is empty
    let num_frames = if order.is_empty() { 0 } else { header.num_frames };

    let mut time = 0.0;
    for frame in 0..num_frames {
        for &index in order.iter() {
            let joint = skeleton.joint_mut(index);
            let mut values = Vec::with_capacity(joint.channels.len());
            for _ in 0..joint.channels.len() {
                match cursor.next_number::<f64>() {
                    Ok(Some(value)) => values.push(value),
                    Ok(None) => {
                        return Err(ParseError::TruncatedData {
                            frame,
                            joint: joint.name.clone(),
                            position: cursor.position(),
                        })
                    }
                    Err((position, token)) => {
                        return Err(ParseError::NumericFormat {
                            expected: "motion value",
                            token: token.to_string(),
                            position,
                        })
                    }
                }
            }
            joint.animation.push(Frame { time, values });
        }
        trace!("decoded frame {} at {}s", frame, time);
        time += header.frame_time;
    }

    if cursor.remaining() > 0 {
        return Err(ParseError::TrailingData {
            remaining: cursor.remaining(),
            position: cursor.position(),
        });
    }
    Ok((header, cursor.position()))
}

//////////////////////////////////////////// PUBLIC /////////////////////////////////////////////

/// Parse a whole .bvh document with the given options.
pub fn parse_bvh_with(content: &str, options: &ParseOptions) -> ParseResult<Bvh> {
    let tokens = tokenize(content);
    let (mut skeleton, cursor) = parse_hierarchy_with(&tokens, options)?;
    let (header, _) = decode_motion(&tokens, cursor, &mut skeleton)?;
    Ok(Bvh {
        skeleton,
        num_frames: header.num_frames,
        frame_time: header.frame_time,
    })
}

/// load a bvh file from a string
pub fn load_bvh_from_string(bvh_string: &str) -> ParseResult<Bvh> {
    parse_bvh_with(bvh_string, &ParseOptions::default())
}

/// load a bvh file from a file path
pub fn load_bvh_from_file<P: AsRef<Path>>(file_path: P) -> ParseResult<Bvh> {
    let contents = std::fs::read_to_string(file_path.as_ref())?;
    debug!("read {} byte(s) from {}", contents.len(), file_path.as_ref().display());
    load_bvh_from_string(&contents)
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const HIPS: &str = "
HIERARCHY
ROOT Hips
{
  OFFSET 0.0 0.0 0.0
  CHANNELS 3 Xposition Yposition Zposition
  End Site { OFFSET 0.0 5.0 0.0 }
}
MOTION
Frames: 2
Frame Time: 0.033333
1.0 2.0 3.0
1.5 2.5 3.5
";

    /// Two children under one joint with an End Site between channel-bearing joints.
    const BRANCHING: &str = "
HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 1 Xposition
  JOINT Left
  {
    OFFSET 1 0 0
    CHANNELS 1 Zrotation
    End Site
    {
      OFFSET 1 0 0
    }
  }
  JOINT Right
  {
    OFFSET -1 0 0
    CHANNELS 2 Zrotation Xrotation
    End Site
    {
      OFFSET -1 0 0
    }
  }
}
MOTION
Frames: 2
Frame Time: 0.5
1 2 3 4
10 20 30 40
";

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_single_root_with_end_site() {
        init();
        let bvh = load_bvh_from_string(HIPS).unwrap();
        assert_eq!(bvh.num_frames, 2);
        assert_eq!(bvh.frame_time, 0.033333);

        let roots: Vec<_> = bvh.skeleton.roots().collect();
        assert_eq!(roots.len(), 1);
        let hips = roots[0];
        assert_eq!(hips.name(), "Hips");
        assert_eq!(hips.offset(), Position::new(0.0, 0.0, 0.0));
        assert_eq!(
            hips.channels(),
            &[Channel::Xposition, Channel::Yposition, Channel::Zposition]
        );
        assert_eq!(
            hips.animation(),
            &[
                Frame { time: 0.0, values: vec![1.0, 2.0, 3.0] },
                Frame { time: 0.033333, values: vec![1.5, 2.5, 3.5] },
            ]
        );

        let leaf = hips.children().next().unwrap();
        assert_eq!(leaf.name(), "End Site");
        assert!(leaf.is_end_site());
        assert_eq!(leaf.offset(), Position::new(0.0, 5.0, 0.0));
        assert!(leaf.animation().is_empty());
        assert_eq!(leaf.parent(), Some(hips));
    }

    #[test]
    fn test_values_follow_declared_child_order() {
        init();
        let bvh = load_bvh_from_string(BRANCHING).unwrap();
        let skeleton = &bvh.skeleton;
        assert_eq!(skeleton.len(), 5);

        let hips = skeleton.find("Hips").unwrap();
        let names: Vec<_> = hips.children().map(|child| child.name()).collect();
        assert_eq!(names, vec!["Left", "Right"]);

        let values = |name: &str| -> Vec<Vec<f64>> {
            skeleton
                .find(name)
                .unwrap()
                .animation()
                .iter()
                .map(|frame| frame.values.clone())
                .collect()
        };
        assert_eq!(values("Hips"), vec![vec![1.0], vec![10.0]]);
        assert_eq!(values("Left"), vec![vec![2.0], vec![20.0]]);
        assert_eq!(values("Right"), vec![vec![3.0, 4.0], vec![30.0, 40.0]]);

        let times: Vec<f64> = skeleton.find("Right").unwrap().animation().iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0.0, 0.5]);
        assert!(skeleton
            .joints()
            .filter(|joint| joint.is_end_site())
            .all(|leaf| leaf.animation().is_empty()));
    }

    #[test]
    fn test_hierarchy_cursor_stops_at_motion() {
        let tokens = tokenize(HIPS);
        let (skeleton, cursor) = parse_hierarchy(&tokens).unwrap();
        assert_eq!(tokens[cursor], "MOTION");
        assert_eq!(skeleton.len(), 2);
        assert!(skeleton.joints().all(|joint| joint.animation().is_empty()));
    }

    #[test]
    fn test_decode_motion_consumes_everything() {
        let tokens = tokenize(HIPS);
        let (mut skeleton, cursor) = parse_hierarchy(&tokens).unwrap();
        let (header, end) = decode_motion(&tokens, cursor, &mut skeleton).unwrap();
        assert_eq!(header, MotionHeader { num_frames: 2, frame_time: 0.033333 });
        assert_eq!(end, tokens.len());
    }

    #[test]
    fn test_multiple_roots() {
        let content = "HIERARCHY
ROOT A { OFFSET 0 0 0 CHANNELS 1 Xposition }
ROOT B { OFFSET 0 0 0 CHANNELS 1 Yposition End Site { OFFSET 0 1 0 } }
MOTION Frames: 1 Frame Time: 1 7 8";
        let bvh = load_bvh_from_string(content).unwrap();
        let roots: Vec<_> = bvh.skeleton.roots().map(|root| root.name()).collect();
        assert_eq!(roots, vec!["A", "B"]);
        assert_eq!(bvh.skeleton.find("A").unwrap().animation()[0].values, vec![7.0]);
        assert_eq!(bvh.skeleton.find("B").unwrap().animation()[0].values, vec![8.0]);

        let strict = ParseOptions { allow_multiple_roots: false };
        match parse_bvh_with(content, &strict) {
            Err(ParseError::MalformedHeader { expected: "MOTION", found, .. }) => assert_eq!(found, "ROOT"),
            other => panic!("expected a MOTION header error, got {:?}", other),
        }
    }

    #[test]
    fn test_document_without_roots() {
        let bvh = load_bvh_from_string("HIERARCHY MOTION Frames: 3 Frame Time: 0.1").unwrap();
        assert!(bvh.skeleton.is_empty());
        assert_eq!(bvh.num_frames, 3);
    }

    #[test]
    fn test_joint_without_channels_line() {
        let content = "HIERARCHY ROOT A { OFFSET 1 2 3 JOINT B { OFFSET 0 0 0 CHANNELS 1 Zrotation } }
MOTION Frames: 1 Frame Time: 0.1 42";
        let bvh = load_bvh_from_string(content).unwrap();
        let a = bvh.skeleton.find("A").unwrap();
        assert!(a.channels().is_empty());
        assert!(a.animation().is_empty());
        assert!(!a.is_end_site());
        assert_eq!(bvh.skeleton.find("B").unwrap().animation()[0].values, vec![42.0]);
    }

    #[test]
    fn test_unknown_channel_names_are_kept() {
        let content = "HIERARCHY ROOT A { OFFSET 0 0 0 CHANNELS 2 Xrotation Wiggle }
MOTION Frames: 1 Frame Time: 0.1 1 2";
        let bvh = load_bvh_from_string(content).unwrap();
        let a = bvh.skeleton.find("A").unwrap();
        assert_eq!(a.channels()[1], Channel::Other("Wiggle".to_string()));
        assert_eq!(a.channel_values(&Channel::Other("Wiggle".to_string())), Some(vec![(0.0, 2.0)]));
    }

    #[test]
    fn test_frame_time_needs_both_tokens() {
        for header in ["Frame Tim: 0.1", "Frames Time: 0.1", "Time: 0.1"] {
            let content = format!("HIERARCHY MOTION Frames: 0 {}", header);
            let err = load_bvh_from_string(&content).unwrap_err();
            assert!(
                matches!(err, ParseError::MalformedMotionHeader { .. }),
                "{}: {:?}",
                header,
                err
            );
        }
    }

    #[test]
    fn test_frame_count_beyond_values_fails_up_front() {
        let content = "HIERARCHY ROOT A { OFFSET 0 0 0 CHANNELS 2 Xposition Yposition }
MOTION Frames: 18446744073709551615 Frame Time: 0.1 1 2 3";
        match load_bvh_from_string(content) {
            Err(ParseError::TruncatedData { frame, joint, position }) => {
                assert_eq!(frame, 1);
                assert_eq!(joint, "A");
                assert_eq!(position, tokenize(content).len());
            }
            other => panic!("expected truncated data, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_frame_count_without_channels() {
        let content = "HIERARCHY ROOT A { OFFSET 0 0 0 End Site { OFFSET 0 1 0 } }
MOTION Frames: 18446744073709551615 Frame Time: 0.1";
        let bvh = load_bvh_from_string(content).unwrap();
        assert_eq!(bvh.num_frames, usize::MAX);
        assert!(bvh.skeleton.joints().all(|joint| joint.animation().is_empty()));
    }

    #[test]
    fn test_keyword_like_joint_names() {
        let content = "HIERARCHY ROOT Site { OFFSET 0 0 0 CHANNELS 1 Xposition
JOINT End { OFFSET 0 0 0 CHANNELS 1 Zrotation } }
MOTION Frames: 1 Frame Time: 0.1 1 2";
        let bvh = load_bvh_from_string(content).unwrap();
        let root = bvh.skeleton.roots().next().unwrap();
        assert_eq!(root.name(), "Site");
        let child = root.children().next().unwrap();
        assert_eq!(child.name(), "End");
        assert!(!child.is_end_site());
        assert_eq!(child.animation()[0].values, vec![2.0]);
    }

    #[test]
    fn test_error_positions() {
        let err = load_bvh_from_string("HIERARCHY ROOT Hips { OFFSET 0 0 }").unwrap_err();
        match err {
            ParseError::NumericFormat { token, position, .. } => {
                assert_eq!(token, "}");
                assert_eq!(position, 7);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = load_bvh_from_string("HIERARCHY ROOT Hips { OFFSET 0 0 0 CHANNELS 0 OFFSET").unwrap_err();
        assert_eq!(err.position(), Some(10));
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));

        let err = load_bvh_from_string("HIERARCHY ROOT Hips OFFSET 0 0 0 }").unwrap_err();
        match err {
            ParseError::MalformedBlock { expected, found, position } => {
                assert_eq!(expected, "{");
                assert_eq!(found, "OFFSET");
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
