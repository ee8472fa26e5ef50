/*!

This is the long-form manual for `proposal_records` and `proptsv`.

## Input format

The input is a spreadsheet (`.xlsx`) or a tab-separated file with a header
row containing at least the following columns:

`proposal_no`, `date_submitted`, `title`, `sponsor`, `prime_sponsor`, `PI`,
`credit`, `first`, `total`, `theme`

Other columns are ignored. Rows where every cell is empty are skipped.
There is one row per author of a proposal. The
`PI` column contains the name of the author as `Last, First`.

Proposal numbers are compared as text, except that a number stored as a
float in the spreadsheet (`1234.0`) is the same proposal as `1234`.

## Aggregation

All the rows of a proposal are combined into a single row:

| column | rule |
|---|---|
| `date_submitted`, `title`, `sponsor`, `prime_sponsor`, `theme` | first value |
| `Authors` | all the names as `First Last`, joined with `,` |
| `credit`, `first` | sum |
| `total` | first value, or maximum (see below) |

Before aggregating, all the proposals are checked: if the rows of any
proposal disagree on the total amount, a warning is printed and the maximum
total is used for **every** proposal.

## Themes

`proptsv themes --normalize` rewrites labels such as `ai/iot  systems` to
`AI / IoT Systems`: whitespace is collapsed, `/` and `-` are surrounded by
single spaces, known acronyms keep their spelling and the other words are
capitalized. The acronyms can be changed with the `acronyms` entry of the
configuration file.

## Configuration file

All the entries are optional. Command line flags take precedence.

```json
{
  "inputPath": "all 2.xlsx",
  "outputPath": "data/publication.tsv",
  "worksheetName": "Sheet1",
  "authorSeparator": ",",
  "groupOrder": "firstSeen",
  "acronyms": ["AI", "CPS", "IoT", "VR", "AR", "ML"],
  "colorMapPath": "pubJavascripts/myscripts/themeColors.json"
}
```

`groupOrder` is either `firstSeen` (the default) or `sorted`.
*/
