/*!

This is the long-form manual for `ranked_tally` and `polltally`.

## Tabulation rules

The instant-runoff tabulation proceeds by rounds. In every round:

1. each ballot counts for its highest ranked candidate that is still active. A ballot
   that has no active candidate left is *exhausted* and stops counting, for this round
   and all the following ones. Empty ballots (abstentions) never count.
2. a candidate holding strictly more than half of the ballots that still count wins.
3. otherwise, if only one candidate is left, it wins.
4. otherwise the candidates with the fewest votes are eliminated. When several candidates
   share the lowest count, the Borda count restricted to these candidates decides: the
   ones with the lowest score are eliminated (all of them if the scores are equal). When
   this would eliminate every remaining candidate, the poll ends in a tie.

The Borda count gives `L - i` points to the candidate at position `i` of a ballot that
ranks `L` candidates. Candidates that are not ranked get nothing from that ballot. The
Borda count over all the candidates is also reported as an alternative result, but it
never changes the instant-runoff winner.

A poll that ends in a tie reports the winner `tie`. This label is reserved: a poll with a
candidate named `tie` is refused.

## Input formats

The following formats are supported by `polltally`:
* `json` (default)
* `csv`
* `xlsx` (Excel)

### `json`

```text
{ "ballots": [ { "id": "v1", "ranking": ["A", "B"] }, { "ranking": [] } ] }
```

The `id` is optional. A bare list of rankings (`[["A", "B"], []]`) is accepted as well.

### `csv`

One ballot per row, the ranked candidates in column order:

```text
id,choice 1,choice 2,choice 3
v1,A,B,
v2,C,,
v3,,,
```

Empty cells are skipped and a row without any candidate is an abstention. The first
choice column and the first ballot row are controlled by `firstVoteColumnIndex` and
`firstVoteRowIndex` (1-based, like the column and row numbers of a spreadsheet).

### `xlsx`

Same layout as `csv`, read from the worksheet named by `excelWorksheetName` (the first
worksheet by default).

## Configuration

```text
{
  "outputSettings": { "pollName": "Lunch", "outputPath": "results.json" },
  "candidates": ["Pizza", "Sushi", "Tacos"],
  "ballotSources": [
    { "provider": "csv", "filePath": "ballots.csv", "firstVoteColumnIndex": 2, "idColumnIndex": 1 }
  ]
}
```

The paths are relative to the configuration file. A ballot that names an unknown candidate
or ranks a candidate twice stops the tabulation: it is reported with its id and never
silently dropped.

 */
