/// Convert a compact duration such as `PT1H30M15S` into seconds.
///
/// The two-character prefix is dropped, then the hour, minute and second
/// markers are consumed in that order. A missing marker, or a marker preceded
/// by something that is not a number, contributes zero. Day, week, month and
/// year components are not understood and are dropped along with whatever
/// they prefix. Totals saturate at `u64::MAX`.
pub fn parse_duration(encoded: &str) -> u64 {
    let mut rest = encoded.get(2..).unwrap_or("");

    let hours = take_component(&mut rest, 'H');
    let minutes = take_component(&mut rest, 'M');
    let seconds = take_component(&mut rest, 'S');

    hours
        .saturating_mul(3600)
        .saturating_add(minutes.saturating_mul(60))
        .saturating_add(seconds)
}

fn take_component(rest: &mut &str, marker: char) -> u64 {
    let Some(pos) = rest.find(marker) else {
        return 0;
    };
    let value = rest[..pos].parse::<u64>().unwrap_or(0);
    *rest = &rest[pos + marker.len_utf8()..];
    value
}
